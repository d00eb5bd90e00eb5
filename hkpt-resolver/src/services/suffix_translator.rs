//! Building suffix translator
//!
//! Deterministic rules for the qualifiers appended to a property's base
//! name: block, phase, floor, wing and compass markers. Rules are tried in
//! order and the first match wins.

use once_cell::sync::Lazy;
use regex::Regex;

static BLOCK_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([0-9A-Za-z]+)座").expect("valid block pattern"));

static CHINESE_PHASE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"第?([零一二三四五六七八九十]+)期").expect("valid phase pattern"));

static ARABIC_PHASE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"第?([0-9]+)期").expect("valid phase pattern"));

static FLOOR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([0-9]+)樓?").expect("valid floor pattern"));

/// Whole-word suffixes, checked by containment
const NAMED_SUFFIXES: &[(&str, &str)] = &[
    ("東座", "East Block"),
    ("西座", "West Block"),
    ("南座", "South Block"),
    ("北座", "North Block"),
    ("中座", "Central Block"),
    ("新翼", "New Wing"),
    ("舊翼", "Old Wing"),
    ("主樓", "Main Building"),
    ("附樓", "Annex Building"),
];

/// Per-character fallback vocabulary
const CHARACTER_WORDS: &[(char, &str)] = &[
    ('翠', "Emerald"),
    ('金', "Golden"),
    ('銀', "Silver"),
    ('海', "Ocean"),
    ('山', "Hill"),
    ('湖', "Lake"),
    ('星', "Star"),
    ('月', "Moon"),
    ('日', "Sun"),
    ('座', "Block"),
    ('期', "Phase"),
    ('樓', "Floor"),
    ('東', "East"),
    ('西', "West"),
    ('南', "South"),
    ('北', "North"),
    ('中', "Central"),
];

/// Translate a residual suffix such as `2座`, `第三期` or `東座`
///
/// Returns `None` when no rule applies and no character is recognized.
pub fn translate_suffix(text: &str) -> Option<String> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Some(caps) = BLOCK_PATTERN.captures(text) {
        return Some(format!("Block {}", &caps[1]));
    }

    if let Some(caps) = CHINESE_PHASE_PATTERN.captures(text) {
        let numeral = &caps[1];
        let number = chinese_to_arabic(numeral)
            .map(|n| n.to_string())
            .unwrap_or_else(|| numeral.to_string());
        return Some(format!("Phase {}", number));
    }

    if let Some(caps) = ARABIC_PHASE_PATTERN.captures(text) {
        return Some(format!("Phase {}", &caps[1]));
    }

    if let Some(caps) = FLOOR_PATTERN.captures(text) {
        return Some(format!("Floor {}", &caps[1]));
    }

    if let Some((_, english)) = NAMED_SUFFIXES
        .iter()
        .find(|(chinese, _)| text.contains(chinese))
    {
        return Some((*english).to_string());
    }

    transliterate(text)
}

/// Convert a Chinese numeral up to 99 (一 .. 九十九)
///
/// Handles single digits, 十, 十X, X十 and X十Y. Anything else is `None`.
pub fn chinese_to_arabic(numeral: &str) -> Option<u32> {
    fn digit(c: char) -> Option<u32> {
        match c {
            '零' => Some(0),
            '一' => Some(1),
            '二' => Some(2),
            '三' => Some(3),
            '四' => Some(4),
            '五' => Some(5),
            '六' => Some(6),
            '七' => Some(7),
            '八' => Some(8),
            '九' => Some(9),
            _ => None,
        }
    }

    let chars: Vec<char> = numeral.chars().collect();
    match chars.as_slice() {
        ['十'] => Some(10),
        ['十', ones] => digit(*ones).map(|n| 10 + n),
        [tens, '十'] => digit(*tens).map(|n| n * 10),
        [tens, '十', ones] => Some(digit(*tens)? * 10 + digit(*ones)?),
        [single] => digit(*single),
        _ => None,
    }
}

fn transliterate(text: &str) -> Option<String> {
    let words: Vec<&str> = text
        .chars()
        .filter_map(|c| {
            CHARACTER_WORDS
                .iter()
                .find(|(chinese, _)| *chinese == c)
                .map(|(_, english)| *english)
        })
        .collect();

    if words.is_empty() {
        None
    } else {
        Some(words.join(" "))
    }
}
