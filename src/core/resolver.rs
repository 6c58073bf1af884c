use crate::core::package::PackageNameResolver;
use crate::core::walker::TypeReferenceNode;
use crate::semantic::{CompiledModel, FileId, Symbol, SymbolLink, SymbolTable};

/// Longest alias/instantiation chain followed before giving up
pub const MAX_ALIAS_CHAIN: usize = 64;

/// Follow `Aliasing` links until reaching a `Direct` symbol.
///
/// A chain longer than [`MAX_ALIAS_CHAIN`] is cut off and the last symbol
/// reached is returned.
pub fn canonical_symbol<'a, T>(table: &'a T, symbol: &'a Symbol) -> &'a Symbol
where
    T: SymbolTable + ?Sized,
{
    match follow_aliases(table, symbol) {
        Ok(canonical) => canonical,
        Err(reached) => {
            log::warn!(
                "alias chain from '{}' is longer than {} links; stopping at '{}'",
                symbol.name,
                MAX_ALIAS_CHAIN,
                reached.name
            );
            reached
        }
    }
}

/// `Err` carries the last symbol reached when the chain is cut off
fn follow_aliases<'a, T>(table: &'a T, symbol: &'a Symbol) -> Result<&'a Symbol, &'a Symbol>
where
    T: SymbolTable + ?Sized,
{
    let mut current = symbol;
    for _ in 0..MAX_ALIAS_CHAIN {
        match current.link {
            SymbolLink::Direct => return Ok(current),
            SymbolLink::Aliasing(target) => current = table.symbol(target),
        }
    }
    match current.link {
        SymbolLink::Direct => Ok(current),
        SymbolLink::Aliasing(_) => Err(current),
    }
}

/// A reference that lands in another package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDependency {
    pub package: String,
    pub type_name: String,
    /// Line of the foreign declaration site
    pub declared_at: usize,
}

/// Turns type references into cross-package dependencies for one package
pub struct SymbolCanonicalizer<'a> {
    package: &'a str,
    names: &'a PackageNameResolver,
}

impl<'a> SymbolCanonicalizer<'a> {
    pub fn new(package: &'a str, names: &'a PackageNameResolver) -> Self {
        Self { package, names }
    }

    /// One dependency per declaration site outside the current package.
    ///
    /// The provider comes from the declaration's own file, the type name from
    /// the canonical symbol. References without a declared symbol yield nothing.
    pub fn resolve<M>(
        &self,
        model: &M,
        file: FileId,
        reference: &TypeReferenceNode<'_>,
    ) -> Vec<ResolvedDependency>
    where
        M: CompiledModel + ?Sized,
    {
        let Some(ty) = model.type_from_type_node(file, reference) else {
            return Vec::new();
        };
        let Some(symbol) = ty.symbol.as_deref() else {
            return Vec::new();
        };

        let mut dependencies = Vec::new();
        for declaration in &symbol.declarations {
            let provider = self.names.package_of(model.file_path(declaration.file));
            if provider == self.package {
                continue;
            }
            let canonical = canonical_symbol(model, symbol);
            dependencies.push(ResolvedDependency {
                package: provider,
                type_name: canonical.name.clone(),
                declared_at: declaration.line,
            });
        }
        dependencies
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semantic::{Declaration, SymbolId};

    struct Table(Vec<Symbol>);

    impl SymbolTable for Table {
        fn symbol(&self, id: SymbolId) -> &Symbol {
            &self.0[id.index()]
        }
    }

    fn linked(name: &str, link: SymbolLink) -> Symbol {
        Symbol {
            name: name.to_string(),
            declarations: vec![Declaration {
                file: FileId(0),
                line: 1,
            }],
            link,
        }
    }

    #[test]
    fn instantiation_resolves_to_generic_declaration() {
        let table = Table(vec![linked("Box", SymbolLink::Direct)]);
        let instantiated = linked("Box<Foo>", SymbolLink::Aliasing(SymbolId(0)));
        assert_eq!(canonical_symbol(&table, &instantiated).name, "Box");
    }

    #[test]
    fn multi_step_chains_are_followed() {
        let table = Table(vec![
            linked("Root", SymbolLink::Direct),
            linked("Middle", SymbolLink::Aliasing(SymbolId(0))),
        ]);
        let start = linked("Leaf", SymbolLink::Aliasing(SymbolId(1)));
        assert_eq!(canonical_symbol(&table, &start).name, "Root");
    }

    /// Symbol 0 is direct, symbol N aliases N-1
    fn chain(len: usize) -> Table {
        let mut symbols = vec![linked("Root", SymbolLink::Direct)];
        for i in 1..len {
            symbols.push(linked(&format!("Link{i}"), SymbolLink::Aliasing(SymbolId(i as u32 - 1))));
        }
        Table(symbols)
    }

    #[test]
    fn chain_of_exactly_max_links_is_complete() {
        let table = chain(MAX_ALIAS_CHAIN);
        let start = linked("Start", SymbolLink::Aliasing(SymbolId(MAX_ALIAS_CHAIN as u32 - 1)));
        assert_eq!(follow_aliases(&table, &start).unwrap().name, "Root");
        assert_eq!(canonical_symbol(&table, &start).name, "Root");
    }

    #[test]
    fn chain_beyond_max_links_is_cut_off() {
        let table = chain(MAX_ALIAS_CHAIN + 1);
        let start = linked("Start", SymbolLink::Aliasing(SymbolId(MAX_ALIAS_CHAIN as u32)));
        let reached = follow_aliases(&table, &start).unwrap_err();
        assert_eq!(reached.name, "Link1");
        assert_eq!(canonical_symbol(&table, &start).name, "Link1");
    }

    #[test]
    fn cyclic_chain_terminates() {
        let table = Table(vec![
            linked("A", SymbolLink::Aliasing(SymbolId(1))),
            linked("B", SymbolLink::Aliasing(SymbolId(0))),
        ]);
        let start = linked("Start", SymbolLink::Aliasing(SymbolId(0)));
        let reached = canonical_symbol(&table, &start);
        assert!(reached.name == "A" || reached.name == "B");
    }
}
