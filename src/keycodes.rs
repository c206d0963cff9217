//! Linux evdev scancode labels
//!
//! `wl_keyboard.key` carries raw evdev codes. The keymap is never
//! interpreted, so labels come from this fixed table.

/// Label for an evdev key code, or `KEY_<code>` when the code is not in the table
pub fn label(code: u32) -> String {
    match known_label(code) {
        Some(name) => name.to_string(),
        None => format!("KEY_{}", code),
    }
}

/// Label for codes in the table
pub fn known_label(code: u32) -> Option<&'static str> {
    let name = match code {
        1 => "Esc",
        2 => "1",
        3 => "2",
        4 => "3",
        5 => "4",
        6 => "5",
        7 => "6",
        8 => "7",
        9 => "8",
        10 => "9",
        11 => "0",
        12 => "Minus",
        13 => "Equal",
        14 => "Backspace",
        15 => "Tab",
        16 => "Q",
        17 => "W",
        18 => "E",
        19 => "R",
        20 => "T",
        21 => "Y",
        22 => "U",
        23 => "I",
        24 => "O",
        25 => "P",
        26 => "LeftBrace",
        27 => "RightBrace",
        28 => "Enter",
        29 => "LeftCtrl",
        30 => "A",
        31 => "S",
        32 => "D",
        33 => "F",
        34 => "G",
        35 => "H",
        36 => "J",
        37 => "K",
        38 => "L",
        39 => "Semicolon",
        40 => "Apostrophe",
        41 => "Grave",
        42 => "LeftShift",
        43 => "Backslash",
        44 => "Z",
        45 => "X",
        46 => "C",
        47 => "V",
        48 => "B",
        49 => "N",
        50 => "M",
        51 => "Comma",
        52 => "Dot",
        53 => "Slash",
        54 => "RightShift",
        56 => "LeftAlt",
        57 => "Space",
        58 => "CapsLock",
        59 => "F1",
        60 => "F2",
        61 => "F3",
        62 => "F4",
        63 => "F5",
        64 => "F6",
        65 => "F7",
        66 => "F8",
        67 => "F9",
        68 => "F10",
        87 => "F11",
        88 => "F12",
        97 => "RightCtrl",
        100 => "RightAlt",
        102 => "Home",
        103 => "Up",
        104 => "PageUp",
        105 => "Left",
        106 => "Right",
        107 => "End",
        108 => "Down",
        109 => "PageDown",
        110 => "Insert",
        111 => "Delete",
        125 => "LeftMeta",
        126 => "RightMeta",
        _ => return None,
    };
    Some(name)
}
