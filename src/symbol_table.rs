use std::collections::HashMap;

use log::warn;

use crate::bytecode::Segment;
use crate::lang::Type;

/// Storage class of a named variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Static,
    Field,
    Argument,
    Local,
}

impl Kind {
    /// Lookup order: subroutine scope first, so a local or parameter shadows
    /// a field or static of the same name.
    const LOOKUP_ORDER: [Kind; 4] = [Kind::Local, Kind::Argument, Kind::Field, Kind::Static];

    fn slot(self) -> usize {
        match self {
            Kind::Static => 0,
            Kind::Field => 1,
            Kind::Argument => 2,
            Kind::Local => 3,
        }
    }

    /// Memory segment a variable of this kind lives in.
    pub fn segment(self) -> Segment {
        match self {
            Kind::Static => Segment::Static,
            Kind::Field => Segment::This,
            Kind::Argument => Segment::Argument,
            Kind::Local => Segment::Local,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub ty: Type,
    pub kind: Kind,
    pub index: u16,
}

/// Two-scope name table.
///
/// Statics and fields live for the whole class; arguments and locals are
/// dropped by `start_subroutine`. Each kind numbers its entries densely from 0
/// in declaration order.
#[derive(Debug, Default)]
pub struct SymbolTable {
    scopes: [HashMap<String, Symbol>; 4],
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears the argument and local scopes.
    pub fn start_subroutine(&mut self) {
        self.scopes[Kind::Argument.slot()].clear();
        self.scopes[Kind::Local.slot()].clear();
    }

    /// Binds `name` to the next free index of `kind`.
    ///
    /// Redefining a name within the same kind keeps the first binding and does
    /// not consume an index.
    pub fn define(&mut self, name: &str, ty: Type, kind: Kind) {
        let scope = &mut self.scopes[kind.slot()];
        if scope.contains_key(name) {
            warn!("'{}' is already defined as {:?}; keeping the first definition", name, kind);
            return;
        }
        let index = scope.len() as u16;
        scope.insert(name.to_string(), Symbol { ty, kind, index });
    }

    /// Number of variables of `kind` defined in the current scope.
    pub fn var_count(&self, kind: Kind) -> u16 {
        self.scopes[kind.slot()].len() as u16
    }

    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        Kind::LOOKUP_ORDER
            .iter()
            .find_map(|kind| self.scopes[kind.slot()].get(name))
    }

    pub fn kind_of(&self, name: &str) -> Option<Kind> {
        self.lookup(name).map(|s| s.kind)
    }

    pub fn type_of(&self, name: &str) -> Option<&Type> {
        self.lookup(name).map(|s| &s.ty)
    }

    pub fn index_of(&self, name: &str) -> Option<u16> {
        self.lookup(name).map(|s| s.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class(name: &str) -> Type {
        Type::Class(name.to_string())
    }

    #[test]
    fn test_dense_indices_per_kind() {
        let mut table = SymbolTable::new();
        table.define("a", Type::Int, Kind::Field);
        table.define("s", Type::Int, Kind::Static);
        table.define("b", Type::Char, Kind::Field);
        table.define("c", class("Point"), Kind::Field);

        assert_eq!(table.index_of("a"), Some(0));
        assert_eq!(table.index_of("b"), Some(1));
        assert_eq!(table.index_of("c"), Some(2));
        assert_eq!(table.index_of("s"), Some(0));
        assert_eq!(table.var_count(Kind::Field), 3);
        assert_eq!(table.var_count(Kind::Static), 1);
        assert_eq!(table.type_of("c"), Some(&class("Point")));
    }

    #[test]
    fn test_start_subroutine_resets_only_subroutine_scope() {
        let mut table = SymbolTable::new();
        table.define("count", Type::Int, Kind::Static);
        table.define("x", Type::Int, Kind::Field);
        table.define("this", class("P"), Kind::Argument);
        table.define("dx", Type::Int, Kind::Argument);
        table.define("i", Type::Int, Kind::Local);
        assert_eq!(table.index_of("dx"), Some(1));

        table.start_subroutine();
        assert_eq!(table.var_count(Kind::Argument), 0);
        assert_eq!(table.var_count(Kind::Local), 0);
        assert_eq!(table.lookup("dx"), None);
        assert_eq!(table.lookup("i"), None);
        assert_eq!(table.kind_of("count"), Some(Kind::Static));
        assert_eq!(table.kind_of("x"), Some(Kind::Field));

        table.define("y", Type::Int, Kind::Argument);
        table.define("j", Type::Int, Kind::Local);
        table.define("z", Type::Int, Kind::Field);
        assert_eq!(table.index_of("y"), Some(0));
        assert_eq!(table.index_of("j"), Some(0));
        assert_eq!(table.index_of("z"), Some(1));
    }

    #[test]
    fn test_first_definition_wins() {
        let mut table = SymbolTable::new();
        table.define("i", Type::Int, Kind::Local);
        table.define("i", Type::Boolean, Kind::Local);
        table.define("j", Type::Int, Kind::Local);

        assert_eq!(table.type_of("i"), Some(&Type::Int));
        assert_eq!(table.index_of("i"), Some(0));
        assert_eq!(table.index_of("j"), Some(1));
        assert_eq!(table.var_count(Kind::Local), 2);
    }

    #[test]
    fn test_subroutine_scope_shadows_class_scope() {
        let mut table = SymbolTable::new();
        table.define("x", Type::Int, Kind::Field);
        table.define("y", Type::Int, Kind::Static);
        table.define("y", Type::Char, Kind::Field);
        table.define("x", Type::Boolean, Kind::Argument);
        table.define("x", class("String"), Kind::Local);

        let x = table.lookup("x").unwrap();
        assert_eq!(x.kind, Kind::Local);
        assert_eq!(x.ty, class("String"));

        // between class kinds, field is searched before static
        assert_eq!(table.kind_of("y"), Some(Kind::Field));

        table.start_subroutine();
        table.define("x", Type::Boolean, Kind::Argument);
        assert_eq!(table.kind_of("x"), Some(Kind::Argument));

        table.start_subroutine();
        assert_eq!(table.kind_of("x"), Some(Kind::Field));
    }

    #[test]
    fn test_unknown_name() {
        let table = SymbolTable::new();
        assert_eq!(table.lookup("nope"), None);
        assert_eq!(table.kind_of("nope"), None);
        assert_eq!(table.index_of("nope"), None);
    }

    #[test]
    fn test_kind_segments() {
        assert_eq!(Kind::Static.segment(), Segment::Static);
        assert_eq!(Kind::Field.segment(), Segment::This);
        assert_eq!(Kind::Argument.segment(), Segment::Argument);
        assert_eq!(Kind::Local.segment(), Segment::Local);
    }
}
