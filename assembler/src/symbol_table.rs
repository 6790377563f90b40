//! Symbol resolution for the Hack assembler.
//!
//! Predefined platform symbols live in a compile-time perfect-hash map;
//! user labels and variables go into a `HashMap` populated during the
//! two passes. Variables are allocated ascending RAM addresses starting
//! at 16, in first-mention order.

use phf::phf_map;
use std::collections::HashMap;

/// The 23 symbols built into the Hack platform.
static PREDEFINED_SYMBOLS: phf::Map<&'static str, u16> = phf_map! {
    // Virtual registers
    "R0" => 0,
    "R1" => 1,
    "R2" => 2,
    "R3" => 3,
    "R4" => 4,
    "R5" => 5,
    "R6" => 6,
    "R7" => 7,
    "R8" => 8,
    "R9" => 9,
    "R10" => 10,
    "R11" => 11,
    "R12" => 12,
    "R13" => 13,
    "R14" => 14,
    "R15" => 15,

    // Segment pointers
    "SP" => 0,
    "LCL" => 1,
    "ARG" => 2,
    "THIS" => 3,
    "THAT" => 4,

    // Memory-mapped I/O
    "SCREEN" => 16384,
    "KBD" => 24576,
};

/// Address at which variable symbols start.
pub const FIRST_VARIABLE_ADDRESS: u16 = 16;

/// Maps identifiers to ROM/RAM addresses.
///
/// # Example
/// ```
/// use assembler::SymbolTable;
///
/// let mut table = SymbolTable::new();
/// assert_eq!(table.address("SP"), Some(0));
///
/// table.bind_label("LOOP", 100);
/// assert_eq!(table.address("LOOP"), Some(100));
/// ```
#[derive(Debug)]
pub struct SymbolTable {
    /// Labels bound in pass 1 and variables allocated in pass 2.
    user_symbols: HashMap<String, u16>,
    next_variable: u16,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    #[must_use]
    pub fn new() -> Self {
        Self {
            user_symbols: HashMap::with_capacity(32),
            next_variable: FIRST_VARIABLE_ADDRESS,
        }
    }

    /// Binds a label to an instruction address (pass 1).
    ///
    /// Predefined symbols cannot be rebound; labels shadowing them are
    /// simply ignored at lookup time because predefined symbols are
    /// checked first.
    pub fn bind_label(&mut self, symbol: &str, address: u16) {
        self.user_symbols.insert(symbol.to_string(), address);
    }

    /// Looks a symbol up without inserting.
    #[must_use]
    pub fn address(&self, symbol: &str) -> Option<u16> {
        PREDEFINED_SYMBOLS
            .get(symbol)
            .or_else(|| self.user_symbols.get(symbol))
            .copied()
    }

    #[must_use]
    pub fn contains(&self, symbol: &str) -> bool {
        PREDEFINED_SYMBOLS.contains_key(symbol) || self.user_symbols.contains_key(symbol)
    }

    /// Resolves a symbol, allocating a fresh variable address on first
    /// mention. This is the hot path of pass 2.
    pub fn resolve(&mut self, symbol: &str) -> u16 {
        use std::collections::hash_map::Entry;

        if let Some(&addr) = PREDEFINED_SYMBOLS.get(symbol) {
            return addr;
        }

        match self.user_symbols.entry(symbol.to_string()) {
            Entry::Occupied(e) => *e.get(),
            Entry::Vacant(e) => {
                let addr = self.next_variable;
                self.next_variable += 1;
                *e.insert(addr)
            }
        }
    }

    /// Number of user-defined symbols (labels plus variables).
    #[must_use]
    pub fn user_symbol_count(&self) -> usize {
        self.user_symbols.len()
    }
}
