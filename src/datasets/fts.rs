/// Builds an FTS5 prefix match expression: every whitespace-separated term
/// must match as a prefix.
///
/// `ROGERIO CASSOL` becomes `"ROGERIO"* AND "CASSOL"*`. Characters other
/// than letters and digits are dropped and each term is quoted as a string,
/// so words such as `OR` or `NOT` are matched literally instead of being
/// read as operators. Returns `None` when no term survives.
pub fn prefix_match(text: &str) -> Option<String> {
    let terms: Vec<String> = text
        .split_whitespace()
        .map(|term| term.chars().filter(|c| c.is_alphanumeric()).collect::<String>())
        .filter(|term| !term.is_empty())
        .map(|term| format!("\"{}\"*", term))
        .collect();

    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" AND "))
    }
}
