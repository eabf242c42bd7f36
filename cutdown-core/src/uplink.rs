// uplink.rs

use crate::types::MAX_SERIAL_NUMBER;

/// Parses a mobile-terminated remote-cut command.
///
/// Accepted format: ASCII `CUT,<serial>,<token>`. The literal is
/// case-insensitive, `<serial>` is a decimal integer that must match
/// this device's serial (seven digits max), and `<token>` must match
/// the configured token exactly, with trailing spaces/tabs and a
/// trailing CR/LF tolerated. Anything else is rejected silently; the
/// caller neither acknowledges nor logs payload contents back over the
/// air.
pub fn parse_cut_command(message: &[u8], serial_number: u32, token: &str) -> bool {
    let Some(rest) = strip_cut_literal(message) else {
        return false;
    };

    let Some((serial, rest)) = parse_serial(rest) else {
        return false;
    };
    if serial != serial_number {
        return false;
    }

    let Some(received) = extract_token(rest) else {
        return false;
    };
    received == token.as_bytes()
}

/// Strips a case-insensitive `CUT,` prefix.
fn strip_cut_literal(message: &[u8]) -> Option<&[u8]> {
    if message.len() < 4 {
        return None;
    }
    if !message[0].eq_ignore_ascii_case(&b'c')
        || !message[1].eq_ignore_ascii_case(&b'u')
        || !message[2].eq_ignore_ascii_case(&b't')
        || message[3] != b','
    {
        return None;
    }
    Some(&message[4..])
}

/// Parses the decimal serial up to the next comma. Rejects empty
/// digits and anything past seven digits.
fn parse_serial(rest: &[u8]) -> Option<(u32, &[u8])> {
    let mut serial: u32 = 0;
    let mut digits = 0usize;

    for (i, &b) in rest.iter().enumerate() {
        match b {
            b'0'..=b'9' => {
                serial = serial.checked_mul(10)?.checked_add((b - b'0') as u32)?;
                if serial > MAX_SERIAL_NUMBER {
                    return None;
                }
                digits += 1;
            }
            b',' => {
                if digits == 0 {
                    return None;
                }
                return Some((serial, &rest[i + 1..]));
            }
            _ => return None,
        }
    }
    None
}

/// Takes the token up to end-of-line and trims trailing blanks.
fn extract_token(rest: &[u8]) -> Option<&[u8]> {
    let mut end = rest.len();
    for (i, &b) in rest.iter().enumerate() {
        if b == b'\r' || b == b'\n' {
            end = i;
            break;
        }
    }
    let mut token = &rest[..end];
    while let [head @ .., b' ' | b'\t'] = token {
        token = head;
    }
    Some(token)
}
