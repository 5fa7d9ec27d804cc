//! Machine / component name normalization
//!
//! Lab reports spell the same physical entity many ways ("CAMIÓN" vs
//! "camion", "Trasmision" vs "Transmisión"). Thresholds are statistical, so
//! textual variants must pool into one population: names are folded to
//! ASCII lowercase and then collapsed through a synonym table before they
//! are used as grouping keys.

/// Component synonym table: substring pattern → canonical name.
///
/// Applied in order; a later matching pattern overrides an earlier one.
const COMPONENT_SYNONYMS: &[(&str, &str)] = &[
    ("mando final", "mando final"),
    ("hidraulico", "hidraulico"),
    ("refrig", "refrigerante"),
    ("aceite", "aceite"),
    ("vibrador", "vibrador"),
    ("cojinete", "cojinete"),
    ("winche", "winche"),
    ("trasmision", "transmision"),
    ("transmision", "transmision"),
    ("tandem", "tandem"),
    ("cubo", "cubo"),
    ("eje", "eje"),
    ("engranaje", "engranaje"),
    ("freno", "freno"),
    ("retardador", "retardador"),
    ("rueda", "rueda"),
    ("direccion", "direccion"),
    ("diferencial", "diferencial"),
];

/// Machine synonym table, same semantics as [`COMPONENT_SYNONYMS`].
const MACHINE_SYNONYMS: &[(&str, &str)] = &[
    ("bulldozer", "bulldozer"),
    ("pala", "pala"),
];

/// Fold a single character to its unaccented ASCII equivalent.
///
/// Covers the Latin-1 accented range seen in Spanish-language lab exports;
/// anything else passes through unchanged.
fn fold_char(c: char) -> char {
    match c {
        'á' | 'à' | 'ä' | 'â' | 'Á' | 'À' | 'Ä' | 'Â' => 'a',
        'é' | 'è' | 'ë' | 'ê' | 'É' | 'È' | 'Ë' | 'Ê' => 'e',
        'í' | 'ì' | 'ï' | 'î' | 'Í' | 'Ì' | 'Ï' | 'Î' => 'i',
        'ó' | 'ò' | 'ö' | 'ô' | 'Ó' | 'Ò' | 'Ö' | 'Ô' => 'o',
        'ú' | 'ù' | 'ü' | 'û' | 'Ú' | 'Ù' | 'Ü' | 'Û' => 'u',
        'ñ' | 'Ñ' => 'n',
        _ => c,
    }
}

/// Standardize a raw name: strip diacritics, lowercase, trim.
pub fn name_protocol(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(fold_char)
        .collect::<String>()
        .to_lowercase()
}

/// Collapse a folded name through a synonym table. The last matching
/// pattern wins, matching the sequential overwrite the tables were tuned
/// against.
fn fold_synonyms(folded: &str, table: &[(&str, &str)]) -> String {
    let mut out = folded.to_string();
    for (pattern, canonical) in table {
        if out.contains(pattern) {
            out = (*canonical).to_string();
        }
    }
    out
}

/// Canonical grouping key for a machine family name.
pub fn canonical_machine(raw: &str) -> String {
    fold_synonyms(&name_protocol(raw), MACHINE_SYNONYMS)
}

/// Canonical grouping key for a component name.
pub fn canonical_component(raw: &str) -> String {
    fold_synonyms(&name_protocol(raw), COMPONENT_SYNONYMS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_protocol_strips_accents_and_case() {
        assert_eq!(name_protocol("CAMIÓN"), "camion");
        assert_eq!(name_protocol("  Transmisión "), "transmision");
        assert_eq!(name_protocol("Niño"), "nino");
    }

    #[test]
    fn test_accent_variants_pool_together() {
        assert_eq!(canonical_machine("CAMIÓN"), canonical_machine("camion"));
        assert_eq!(
            canonical_component("Trasmisión Delantera"),
            canonical_component("TRANSMISION delantera")
        );
    }

    #[test]
    fn test_component_synonym_folding() {
        assert_eq!(canonical_component("Refrig. Motor"), "refrigerante");
        assert_eq!(canonical_component("Trasmision"), "transmision");
        assert_eq!(canonical_component("Mando Final Izquierdo"), "mando final");
    }

    #[test]
    fn test_unmapped_names_pass_through_folded() {
        assert_eq!(canonical_component("Compresor A/C"), "compresor a/c");
        assert_eq!(canonical_machine("Perforadora"), "perforadora");
    }
}
