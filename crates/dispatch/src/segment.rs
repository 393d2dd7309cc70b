//! Splitting message text into SMS segments.
//!
//! Text that fits the GSM 03.38 default alphabet is sized in septets
//! (extension-table characters cost two). Anything else is sent as UCS-2 and
//! sized in UTF-16 code units. Concatenated parts lose room to the user data
//! header, hence the smaller per-part limits.

/// Maximum septets in a single GSM 7-bit message.
pub const GSM7_SINGLE_LIMIT: usize = 160;

/// Maximum septets per part of a concatenated GSM 7-bit message.
pub const GSM7_PART_LIMIT: usize = 153;

/// Maximum UTF-16 units in a single UCS-2 message.
pub const UCS2_SINGLE_LIMIT: usize = 70;

/// Maximum UTF-16 units per part of a concatenated UCS-2 message.
pub const UCS2_PART_LIMIT: usize = 67;

const GSM7_BASIC: &str = "@£$¥èéùìòÇ\nØø\rÅåΔ_ΦΓΛΩΠΨΣΘΞÆæßÉ !\"#¤%&'()*+,-./0123456789:;<=>?\
¡ABCDEFGHIJKLMNOPQRSTUVWXYZÄÖÑÜ§¿abcdefghijklmnopqrstuvwxyzäöñüà";

const GSM7_EXTENSION: &str = "\u{0C}^{}\\[~]|€";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Gsm7,
    Ucs2,
}

impl Encoding {
    fn limits(self) -> (usize, usize) {
        match self {
            Encoding::Gsm7 => (GSM7_SINGLE_LIMIT, GSM7_PART_LIMIT),
            Encoding::Ucs2 => (UCS2_SINGLE_LIMIT, UCS2_PART_LIMIT),
        }
    }

    fn cost(self, c: char) -> usize {
        match self {
            Encoding::Gsm7 => gsm7_cost(c).unwrap_or(1),
            Encoding::Ucs2 => c.len_utf16(),
        }
    }
}

fn gsm7_cost(c: char) -> Option<usize> {
    if GSM7_BASIC.contains(c) {
        Some(1)
    } else if GSM7_EXTENSION.contains(c) {
        Some(2)
    } else {
        None
    }
}

pub fn encoding_for(text: &str) -> Encoding {
    if text.chars().all(|c| gsm7_cost(c).is_some()) {
        Encoding::Gsm7
    } else {
        Encoding::Ucs2
    }
}

/// Split `text` into the ordered parts it would be sent as.
///
/// Returns a single part when the text fits one message. Characters are
/// never split across parts.
pub fn divide_message(text: &str) -> Vec<String> {
    let encoding = encoding_for(text);
    let (single, per_part) = encoding.limits();

    let total: usize = text.chars().map(|c| encoding.cost(c)).sum();
    if total <= single {
        return vec![text.to_string()];
    }

    let mut parts = Vec::new();
    let mut current = String::new();
    let mut used = 0;
    for c in text.chars() {
        let cost = encoding.cost(c);
        if used + cost > per_part {
            parts.push(std::mem::take(&mut current));
            used = 0;
        }
        current.push(c);
        used += cost;
    }
    if !current.is_empty() {
        parts.push(current);
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_is_single_part() {
        let parts = divide_message("Busy, will call back");
        assert_eq!(parts, vec!["Busy, will call back".to_string()]);
    }

    #[test]
    fn test_gsm7_boundary() {
        let exact = "a".repeat(GSM7_SINGLE_LIMIT);
        assert_eq!(divide_message(&exact).len(), 1);

        let over = "a".repeat(GSM7_SINGLE_LIMIT + 1);
        let parts = divide_message(&over);
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].len(), GSM7_PART_LIMIT);
        assert_eq!(parts[1].len(), GSM7_SINGLE_LIMIT + 1 - GSM7_PART_LIMIT);
    }

    #[test]
    fn test_extension_characters_cost_two_septets() {
        assert_eq!(encoding_for("price: 5€ [approx]"), Encoding::Gsm7);

        let fits = "€".repeat(GSM7_SINGLE_LIMIT / 2);
        assert_eq!(divide_message(&fits).len(), 1);

        let over = "€".repeat(GSM7_SINGLE_LIMIT / 2 + 1);
        let parts = divide_message(&over);
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].chars().count(), GSM7_PART_LIMIT / 2);
    }

    #[test]
    fn test_ucs2_text() {
        assert_eq!(encoding_for("Перезвоню"), Encoding::Ucs2);

        let fits = "ж".repeat(UCS2_SINGLE_LIMIT);
        assert_eq!(divide_message(&fits).len(), 1);

        let over = "ж".repeat(UCS2_SINGLE_LIMIT + 1);
        let parts = divide_message(&over);
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].chars().count(), UCS2_PART_LIMIT);
    }

    #[test]
    fn test_surrogate_pairs_never_split() {
        let text = "📞".repeat(36);
        let parts = divide_message(&text);
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].chars().count(), UCS2_PART_LIMIT / 2);
        assert_eq!(parts.concat(), text);
    }

    #[test]
    fn test_parts_reassemble_in_order() {
        let text: String = (0..400).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
        let parts = divide_message(&text);
        assert_eq!(parts.len(), 3);
        assert_eq!(parts.concat(), text);
    }
}
