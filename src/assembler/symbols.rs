use std::collections::HashMap;

/// Base of the memory-mapped screen.
pub const SCREEN: u16 = 16384;
/// Memory-mapped keyboard register.
pub const KBD: u16 = 24576;
/// First address handed out to variables.
pub const VARIABLE_BASE: u16 = 16;

/// Label and variable addresses for one program.
#[derive(Debug, Clone)]
pub struct Symbols {
    addresses: HashMap<String, u16>,
}

impl Default for Symbols {
    fn default() -> Self {
        Self::new()
    }
}

impl Symbols {
    /// A table holding only the predefined symbols.
    pub fn new() -> Self {
        let mut addresses = HashMap::new();
        for (name, address) in [("SP", 0), ("LCL", 1), ("ARG", 2), ("THIS", 3), ("THAT", 4)] {
            addresses.insert(name.to_string(), address);
        }
        for r in 0..16u16 {
            addresses.insert(format!("R{}", r), r);
        }
        addresses.insert("SCREEN".to_string(), SCREEN);
        addresses.insert("KBD".to_string(), KBD);
        Symbols { addresses }
    }

    pub fn get(&self, name: &str) -> Option<u16> {
        self.addresses.get(name).copied()
    }

    /// Binds `name` to `address`; false if it was already bound.
    #[must_use]
    pub fn define(&mut self, name: &str, address: u16) -> bool {
        if self.addresses.contains_key(name) {
            return false;
        }
        self.addresses.insert(name.to_string(), address);
        true
    }
}

/// Hands out sequential RAM addresses to variables, from 16 up to the
/// screen base.
#[derive(Debug, Clone)]
pub struct VariableAllocator {
    next: u16,
}

impl Default for VariableAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl VariableAllocator {
    pub fn new() -> Self {
        VariableAllocator {
            next: VARIABLE_BASE,
        }
    }

    pub fn allocate(&mut self) -> Option<u16> {
        if self.next >= SCREEN {
            return None;
        }
        let address = self.next;
        self.next += 1;
        Some(address)
    }
}

/// True for `[A-Za-z_.$:][A-Za-z0-9_.$:]*`.
pub fn is_symbol(text: &str) -> bool {
    let mut chars = text.chars();
    let symbol_char = |c: char| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '$' | ':');
    match chars.next() {
        Some(first) if symbol_char(first) && !first.is_ascii_digit() => chars.all(symbol_char),
        _ => false,
    }
}
