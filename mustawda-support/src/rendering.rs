//! Text rendering utilities for human-friendly error messages.
//!
//! Provides helpers to format resolution chains, type names,
//! and suggestions for misspelled names in error output.

/// Renders a resolution chain as a readable string.
///
/// # Examples
/// ```
/// use mustawda_support::rendering::render_chain;
///
/// let chain = vec!["a", "c", "a"];
/// let rendered = render_chain(&chain);
/// assert_eq!(rendered, "a → c → a");
/// ```
pub fn render_chain(chain: &[impl AsRef<str>]) -> String {
    chain
        .iter()
        .map(|s| s.as_ref())
        .collect::<Vec<_>>()
        .join(" → ")
}

/// Shortens a fully qualified type name for display.
///
/// ```
/// use mustawda_support::rendering::shorten_type_name;
///
/// let short = shorten_type_name("my_app::services::user::UserService");
/// assert_eq!(short, "UserService");
///
/// let short = shorten_type_name("alloc::sync::Arc<dyn my_app::traits::Logger>");
/// assert_eq!(short, "Arc<dyn Logger>");
/// ```
pub fn shorten_type_name(full_name: &str) -> String {
    let mut result = String::with_capacity(full_name.len());
    let mut chars = full_name.chars().peekable();
    let mut current_segment = String::new();

    while let Some(ch) = chars.next() {
        match ch {
            ':' if chars.peek() == Some(&':') => {
                chars.next();
                current_segment.clear();
            }
            '<' | '>' | ',' | ' ' => {
                result.push_str(&current_segment);
                result.push(ch);
                current_segment.clear();
            }
            _ => {
                current_segment.push(ch);
            }
        }
    }

    result.push_str(&current_segment);
    result
}

/// Folds a name for loose comparison: lowercase, separators dropped.
///
/// ```
/// use mustawda_support::rendering::fold_name;
///
/// assert_eq!(fold_name("User-Repo"), "userrepo");
/// assert_eq!(fold_name("user_repo"), "userrepo");
/// ```
pub fn fold_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Generates "did you mean?" suggestions for a requested name.
///
/// Compares the requested name against the available ones and returns
/// at most `max_suggestions` close matches, best first.
pub fn suggest_similar(
    requested: &str,
    available: &[&str],
    max_suggestions: usize,
) -> Vec<String> {
    let requested_folded = fold_name(requested);
    if requested_folded.is_empty() {
        return Vec::new();
    }

    let mut scored: Vec<(&str, usize)> = available
        .iter()
        .filter(|&&name| name != requested)
        .filter_map(|&name| {
            let name_folded = fold_name(name);
            if name_folded.is_empty() {
                return None;
            }

            // Same name modulo case and separators
            if name_folded == requested_folded {
                return Some((name, 100));
            }

            if name_folded.contains(&requested_folded)
                || requested_folded.contains(&name_folded)
            {
                return Some((name, 80));
            }

            let common = name_folded
                .chars()
                .zip(requested_folded.chars())
                .take_while(|(a, b)| a == b)
                .count();

            if common >= 3 {
                return Some((name, common * 10));
            }

            None
        })
        .collect();

    scored.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    scored
        .into_iter()
        .take(max_suggestions)
        .map(|(name, _)| name.to_string())
        .collect()
}
