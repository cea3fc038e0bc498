//! The 48K keyboard matrix.
//!
//! 40 keys in 8 half-rows of 5. The high byte of a port $FE read selects
//! half-rows (one address bit per row, active low); each selected row
//! contributes its pressed keys to the low 5 result bits, also active low.
//!
//! | Addr bit | Keys (column 0..4)          |
//! |----------|-----------------------------|
//! | A8       | Caps Shift, Z, X, C, V      |
//! | A9       | A, S, D, F, G               |
//! | A10      | Q, W, E, R, T               |
//! | A11      | 1, 2, 3, 4, 5               |
//! | A12      | 0, 9, 8, 7, 6               |
//! | A13      | P, O, I, U, Y               |
//! | A14      | Enter, L, K, J, H           |
//! | A15      | Space, Symbol Shift, M, N, B|

/// A key on the 48K keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    CapsShift,
    Z,
    X,
    C,
    V,
    A,
    S,
    D,
    F,
    G,
    Q,
    W,
    E,
    R,
    T,
    N1,
    N2,
    N3,
    N4,
    N5,
    N0,
    N9,
    N8,
    N7,
    N6,
    P,
    O,
    I,
    U,
    Y,
    Enter,
    L,
    K,
    J,
    H,
    Space,
    SymbolShift,
    M,
    N,
    B,
}

/// Half-row select bit → the five keys on that row, column 0 first.
pub const HALF_ROWS: [[Key; 5]; 8] = [
    [Key::CapsShift, Key::Z, Key::X, Key::C, Key::V],
    [Key::A, Key::S, Key::D, Key::F, Key::G],
    [Key::Q, Key::W, Key::E, Key::R, Key::T],
    [Key::N1, Key::N2, Key::N3, Key::N4, Key::N5],
    [Key::N0, Key::N9, Key::N8, Key::N7, Key::N6],
    [Key::P, Key::O, Key::I, Key::U, Key::Y],
    [Key::Enter, Key::L, Key::K, Key::J, Key::H],
    [Key::Space, Key::SymbolShift, Key::M, Key::N, Key::B],
];
