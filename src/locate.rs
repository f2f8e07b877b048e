use geojson::{Feature, FeatureCollection, feature::Id};

use crate::iso::{Alpha2, IsoTable};

/// Identyfikator cechy jako tekst dopełniony zerami do 3 cyfr.
pub fn feature_numeric_id(feature: &Feature) -> Option<String> {
    let raw = match feature.id.as_ref()? {
        Id::String(s) => s.clone(),
        // 276.0 też jest liczbą całkowitą
        Id::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() && f.is_finite() && f.fract() == 0.0 => format!("{}", f as i64),
            _ => n.to_string(),
        },
    };
    Some(format!("{raw:0>3}"))
}

/// Kod alpha-2 cechy, wyliczany zawsze od nowa z identyfikatora.
pub fn feature_alpha2(feature: &Feature, table: &IsoTable) -> Option<Alpha2> {
    table.resolve_str(&feature_numeric_id(feature)?)
}

/// Nazwa z właściwości, jeśli jest tekstem.
pub fn feature_name(feature: &Feature) -> Option<&str> {
    feature.properties.as_ref()?.get("name")?.as_str()
}

/// Pierwsza cecha w kolejności kolekcji, której kod to `code`.
///
/// Duplikaty rozstrzyga kolejność; cechy bez identyfikatora są pomijane.
pub fn find_country<'a>(
    collection: &'a FeatureCollection,
    code: Alpha2,
    table: &IsoTable,
) -> Option<&'a Feature> {
    collection
        .features
        .iter()
        .find(|feature| feature_alpha2(feature, table) == Some(code))
}
