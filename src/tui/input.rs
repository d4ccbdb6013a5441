use std::io::{self, Read};

#[derive(Debug, Clone, PartialEq)]
pub enum Key {
    Char(char),
    Enter,
    Escape,
    Backspace,
    Tab,
    Up,
    Down,
    Left,
    Right,
    PageUp,
    PageDown,
    Home,
    End,
    Delete,
    Ctrl(char),
    MouseClick { row: u16, col: u16 },
    ScrollUp,
    ScrollDown,
}

/// Read a single keypress from stdin.
/// Returns None if no key is available (timeout expired).
pub fn read_key() -> Option<Key> {
    let stdin = io::stdin();
    let mut lock = stdin.lock();
    parse_key(&mut lock)
}

fn next_byte<R: Read>(r: &mut R) -> Option<u8> {
    let mut buf = [0u8; 1];
    match r.read(&mut buf) {
        Ok(1) => Some(buf[0]),
        _ => None,
    }
}

/// Decode one key from a byte stream in terminal raw mode.
pub fn parse_key<R: Read>(r: &mut R) -> Option<Key> {
    let first = next_byte(r)?;
    let key = match first {
        13 => Key::Enter,
        27 => parse_escape(r),
        127 | 8 => Key::Backspace,
        9 => Key::Tab,
        b @ 1..=26 => Key::Ctrl((b'a' + b - 1) as char),
        b if b.is_ascii() && b >= 32 => Key::Char(b as char),
        b => parse_utf8(b, r),
    };
    Some(key)
}

fn parse_utf8<R: Read>(lead: u8, r: &mut R) -> Key {
    let extra = match lead {
        0xC0..=0xDF => 1,
        0xE0..=0xEF => 2,
        0xF0..=0xF7 => 3,
        _ => return Key::Char('?'),
    };
    let mut bytes = vec![lead];
    for _ in 0..extra {
        match next_byte(r) {
            Some(b) => bytes.push(b),
            None => return Key::Char('?'),
        }
    }
    std::str::from_utf8(&bytes)
        .ok()
        .and_then(|s| s.chars().next())
        .map(Key::Char)
        .unwrap_or(Key::Char('?'))
}

fn parse_escape<R: Read>(r: &mut R) -> Key {
    // A bare ESC times out with nothing after it.
    if next_byte(r) != Some(b'[') {
        return Key::Escape;
    }
    match next_byte(r) {
        Some(b'A') => Key::Up,
        Some(b'B') => Key::Down,
        Some(b'C') => Key::Right,
        Some(b'D') => Key::Left,
        Some(b'H') => Key::Home,
        Some(b'F') => Key::End,
        Some(d @ b'0'..=b'9') => parse_tilde_sequence(d, r),
        Some(b'<') => parse_sgr_mouse(r),
        _ => Key::Escape,
    }
}

// ESC [ n ~
fn parse_tilde_sequence<R: Read>(first_digit: u8, r: &mut R) -> Key {
    let mut num: u16 = (first_digit - b'0') as u16;
    loop {
        match next_byte(r) {
            Some(d @ b'0'..=b'9') => {
                num = num.saturating_mul(10).saturating_add((d - b'0') as u16);
            }
            Some(b'~') => {
                return match num {
                    1 | 7 => Key::Home,
                    3 => Key::Delete,
                    4 | 8 => Key::End,
                    5 => Key::PageUp,
                    6 => Key::PageDown,
                    _ => Key::Escape,
                };
            }
            _ => return Key::Escape,
        }
    }
}

// ESC [ < btn ; col ; row (M|m)
fn parse_sgr_mouse<R: Read>(r: &mut R) -> Key {
    let mut params = [0u16; 3];
    let mut idx = 0;
    loop {
        match next_byte(r) {
            Some(d @ b'0'..=b'9') => {
                if idx < params.len() {
                    params[idx] = params[idx].saturating_mul(10).saturating_add((d - b'0') as u16);
                }
            }
            Some(b';') => idx += 1,
            Some(b'M') if idx == 2 => {
                return match params[0] {
                    0 => Key::MouseClick {
                        row: params[2],
                        col: params[1],
                    },
                    64 => Key::ScrollUp,
                    65 => Key::ScrollDown,
                    _ => Key::Escape,
                };
            }
            // Releases and malformed sequences are ignored.
            _ => return Key::Escape,
        }
    }
}
