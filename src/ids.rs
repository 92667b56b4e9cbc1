use serde_json::{Map, Value};
use std::collections::HashSet;
use std::time::{SystemTime, UNIX_EPOCH};

pub const SLUG_MAX_LEN: usize = 64;
pub const SLUG_FALLBACK: &str = "item";

const UNIQUE_SUFFIX_ATTEMPTS: u64 = 50;

/// Derive a stable key-safe identifier from a human label: lowercase, Latin
/// diacritics folded, runs of anything else collapsed to a single `_`,
/// bounded to 64 chars, `"item"` when nothing survives.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for c in text.to_lowercase().chars() {
        if let Some(folded) = fold_latin(c) {
            slug.push_str(folded);
        } else if c.is_ascii_alphanumeric() {
            slug.push(c);
        } else if !slug.is_empty() && !slug.ends_with('_') {
            slug.push('_');
        }
    }
    slug.truncate(SLUG_MAX_LEN);
    let trimmed = slug.trim_matches('_');
    if trimmed.is_empty() {
        SLUG_FALLBACK.to_string()
    } else {
        trimmed.to_string()
    }
}

fn fold_latin(c: char) -> Option<&'static str> {
    let folded = match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ă' | 'ą' => "a",
        'ç' | 'ć' | 'č' => "c",
        'ď' | 'đ' | 'ð' => "d",
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ė' | 'ę' | 'ě' => "e",
        'ì' | 'í' | 'î' | 'ï' | 'ī' | 'į' => "i",
        'ľ' | 'ł' => "l",
        'ñ' | 'ń' | 'ň' => "n",
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' => "o",
        'ŕ' | 'ř' => "r",
        'ś' | 'š' => "s",
        'ť' => "t",
        'ù' | 'ú' | 'û' | 'ü' | 'ū' | 'ů' => "u",
        'ý' | 'ÿ' => "y",
        'ź' | 'ż' | 'ž' => "z",
        'æ' => "ae",
        'œ' => "oe",
        'ß' => "ss",
        'þ' => "th",
        _ => return None,
    };
    Some(folded)
}

/// Return `base` if free, else `base_2`, `base_3`, ... After a bounded number
/// of attempts fall back to a timestamp token, bumped until it is free, so the
/// result is always outside `used`.
pub fn make_unique_id(base: &str, used: &HashSet<String>) -> String {
    if !used.contains(base) {
        return base.to_string();
    }
    for n in 2..2 + UNIQUE_SUFFIX_ATTEMPTS {
        let candidate = format!("{base}_{n}");
        if !used.contains(&candidate) {
            return candidate;
        }
    }
    let mut stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0);
    loop {
        let candidate = format!("{base}_{stamp}");
        if !used.contains(&candidate) {
            return candidate;
        }
        stamp += 1;
    }
}

/// Shared normalization for goals and checklist items. Non-object entries are
/// dropped, the label comes from the first non-empty field in `label_fields`,
/// an explicit `id` wins over the label slug, and duplicate ids keep the first
/// occurrence in input order.
pub fn normalize_entries<T>(
    raw: &[Value],
    label_fields: &[&str],
    mut build: impl FnMut(&Map<String, Value>, String, String) -> T,
) -> Vec<T> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for entry in raw {
        let Some(obj) = entry.as_object() else { continue };
        let Some(label) = resolve_label(obj, label_fields) else {
            continue;
        };
        let id = obj
            .get("id")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| slugify(&label));
        if !seen.insert(id.clone()) {
            continue;
        }
        out.push(build(obj, id, label));
    }
    out
}

fn resolve_label(obj: &Map<String, Value>, fields: &[&str]) -> Option<String> {
    for field in fields {
        if let Some(value) = obj.get(*field).and_then(Value::as_str) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
    }
    None
}
