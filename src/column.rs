//! Spreadsheet-style column labels (A, B, ..., Z, AA, AB, ...).

const ALPHABET_LEN: usize = 26;

/// Convert a zero-based column index to its letter label.
///
/// Uses bijective base-26, so 25 is "Z", 26 is "AA", 51 is "AZ" and 52 is "BA".
pub fn column_label(index: usize) -> String {
    let mut letters = Vec::new();
    let mut n = index + 1;

    while n > 0 {
        let rem = (n - 1) % ALPHABET_LEN;
        letters.push(char::from(b'A' + rem as u8));
        n = (n - 1) / ALPHABET_LEN;
    }

    letters.iter().rev().collect()
}
