use serde::Deserialize;
use std::{
    collections::{BTreeMap, HashMap},
    fmt,
    str::FromStr,
    sync::LazyLock,
};
use thiserror::Error;
use tracing::warn;

/// Dwuliterowy kod ISO-3166-1 alpha-2, zawsze wielkimi literami.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Alpha2([u8; 2]);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid alpha-2 country code: {0:?}")]
pub struct InvalidCode(pub String);

impl Alpha2 {
    pub fn as_str(&self) -> &str {
        // Zawsze ASCII, sprawdzone w `from_str`.
        std::str::from_utf8(&self.0).unwrap_or("??")
    }

    /// Trasa strony szczegółów kraju.
    pub fn route(&self) -> String {
        format!("/country/{}", self.as_str())
    }
}

impl FromStr for Alpha2 {
    type Err = InvalidCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.as_bytes() {
            [a, b] if a.is_ascii_alphabetic() && b.is_ascii_alphabetic() => {
                Ok(Self([a.to_ascii_uppercase(), b.to_ascii_uppercase()]))
            }
            _ => Err(InvalidCode(s.to_string())),
        }
    }
}

impl fmt::Display for Alpha2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tablica ISO numeric → alpha-2.
///
/// Źródłowa tablica nie musi trzymać się jednego typu klucza, więc
/// przechowujemy osobno wpisy liczbowe (`4`) i tekstowe (`"004"`).
#[derive(Clone, Debug, Default)]
pub struct IsoTable {
    by_number: HashMap<u32, String>,
    by_code: HashMap<String, String>,
}

static BUILTIN: LazyLock<IsoTable> = LazyLock::new(|| {
    let mut table = IsoTable::default();
    for &(number, alpha2) in ISO_3166_NUMERIC {
        table.insert_number(u32::from(number), alpha2);
        table.insert_code(&format!("{number:03}"), alpha2);
    }
    table
});

impl IsoTable {
    /// Pełna tablica ISO-3166-1, z kluczami w obu formach.
    pub fn builtin() -> &'static Self {
        &BUILTIN
    }

    pub fn insert_number(&mut self, number: u32, alpha2: &str) {
        self.by_number.insert(number, alpha2.to_string());
    }

    pub fn insert_code(&mut self, code: &str, alpha2: &str) {
        self.by_code.insert(code.to_string(), alpha2.to_string());
    }

    /// Ładuje tablicę z obiektu JSON `{ "4": "af", "008": "al", ... }`.
    ///
    /// Klucz będący kanonicznym zapisem liczby trafia do wpisów liczbowych,
    /// każdy inny (np. z zerami wiodącymi) do tekstowych.
    pub fn from_json(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        #[derive(Deserialize)]
        #[serde(transparent)]
        struct Raw(BTreeMap<String, String>);

        let Raw(raw) = serde_json::from_slice(bytes)?;
        let mut table = Self::default();
        for (key, alpha2) in raw {
            match key.parse::<u32>() {
                Ok(number) if number.to_string() == key => table.insert_number(number, &alpha2),
                _ => table.insert_code(&key, &alpha2),
            }
        }
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.by_number.len() + self.by_code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rozwiązuje identyfikator tekstowy ("276", "004", "4").
    ///
    /// Najpierw klucz liczbowy, potem tekstowy.
    pub fn resolve_str(&self, numeric: &str) -> Option<Alpha2> {
        let numeric = numeric.trim();
        let by_number = numeric
            .parse::<u32>()
            .ok()
            .and_then(|n| self.by_number.get(&n));
        by_number
            .or_else(|| self.by_code.get(numeric))
            .and_then(|raw| to_alpha2(numeric, raw))
    }

    /// Rozwiązuje identyfikator liczbowy; forma tekstowa to trzy cyfry z zerami.
    pub fn resolve_number(&self, number: u32) -> Option<Alpha2> {
        self.by_number
            .get(&number)
            .or_else(|| self.by_code.get(&format!("{number:03}")))
            .and_then(|raw| to_alpha2(&number.to_string(), raw))
    }
}

fn to_alpha2(numeric: &str, raw: &str) -> Option<Alpha2> {
    match raw.parse() {
        Ok(code) => Some(code),
        Err(_) => {
            warn!(numeric, value = raw, "ISO table entry is not an alpha-2 code");
            None
        }
    }
}

/// ISO-3166-1: kod numeryczny → alpha-2.
const ISO_3166_NUMERIC: &[(u16, &str)] = &[
    (4, "AF"), (8, "AL"), (10, "AQ"), (12, "DZ"), (16, "AS"), (20, "AD"),
    (24, "AO"), (28, "AG"), (31, "AZ"), (32, "AR"), (36, "AU"), (40, "AT"),
    (44, "BS"), (48, "BH"), (50, "BD"), (51, "AM"), (52, "BB"), (56, "BE"),
    (60, "BM"), (64, "BT"), (68, "BO"), (70, "BA"), (72, "BW"), (74, "BV"),
    (76, "BR"), (84, "BZ"), (86, "IO"), (90, "SB"), (92, "VG"), (96, "BN"),
    (100, "BG"), (104, "MM"), (108, "BI"), (112, "BY"), (116, "KH"), (120, "CM"),
    (124, "CA"), (132, "CV"), (136, "KY"), (140, "CF"), (144, "LK"), (148, "TD"),
    (152, "CL"), (156, "CN"), (158, "TW"), (162, "CX"), (166, "CC"), (170, "CO"),
    (174, "KM"), (175, "YT"), (178, "CG"), (180, "CD"), (184, "CK"), (188, "CR"),
    (191, "HR"), (192, "CU"), (196, "CY"), (203, "CZ"), (204, "BJ"), (208, "DK"),
    (212, "DM"), (214, "DO"), (218, "EC"), (222, "SV"), (226, "GQ"), (231, "ET"),
    (232, "ER"), (233, "EE"), (234, "FO"), (238, "FK"), (239, "GS"), (242, "FJ"),
    (246, "FI"), (248, "AX"), (250, "FR"), (254, "GF"), (258, "PF"), (260, "TF"),
    (262, "DJ"), (266, "GA"), (268, "GE"), (270, "GM"), (275, "PS"), (276, "DE"),
    (288, "GH"), (292, "GI"), (296, "KI"), (300, "GR"), (304, "GL"), (308, "GD"),
    (312, "GP"), (316, "GU"), (320, "GT"), (324, "GN"), (328, "GY"), (332, "HT"),
    (334, "HM"), (336, "VA"), (340, "HN"), (344, "HK"), (348, "HU"), (352, "IS"),
    (356, "IN"), (360, "ID"), (364, "IR"), (368, "IQ"), (372, "IE"), (376, "IL"),
    (380, "IT"), (384, "CI"), (388, "JM"), (392, "JP"), (398, "KZ"), (400, "JO"),
    (404, "KE"), (408, "KP"), (410, "KR"), (414, "KW"), (417, "KG"), (418, "LA"),
    (422, "LB"), (426, "LS"), (428, "LV"), (430, "LR"), (434, "LY"), (438, "LI"),
    (440, "LT"), (442, "LU"), (446, "MO"), (450, "MG"), (454, "MW"), (458, "MY"),
    (462, "MV"), (466, "ML"), (470, "MT"), (474, "MQ"), (478, "MR"), (480, "MU"),
    (484, "MX"), (492, "MC"), (496, "MN"), (498, "MD"), (499, "ME"), (500, "MS"),
    (504, "MA"), (508, "MZ"), (512, "OM"), (516, "NA"), (520, "NR"), (524, "NP"),
    (528, "NL"), (531, "CW"), (533, "AW"), (534, "SX"), (535, "BQ"), (540, "NC"),
    (548, "VU"), (554, "NZ"), (558, "NI"), (562, "NE"), (566, "NG"), (570, "NU"),
    (574, "NF"), (578, "NO"), (580, "MP"), (581, "UM"), (583, "FM"), (584, "MH"),
    (585, "PW"), (586, "PK"), (591, "PA"), (598, "PG"), (600, "PY"), (604, "PE"),
    (608, "PH"), (612, "PN"), (616, "PL"), (620, "PT"), (624, "GW"), (626, "TL"),
    (630, "PR"), (634, "QA"), (638, "RE"), (642, "RO"), (643, "RU"), (646, "RW"),
    (652, "BL"), (654, "SH"), (659, "KN"), (660, "AI"), (662, "LC"), (663, "MF"),
    (666, "PM"), (670, "VC"), (674, "SM"), (678, "ST"), (682, "SA"), (686, "SN"),
    (688, "RS"), (690, "SC"), (694, "SL"), (702, "SG"), (703, "SK"), (704, "VN"),
    (705, "SI"), (706, "SO"), (710, "ZA"), (716, "ZW"), (724, "ES"), (728, "SS"),
    (729, "SD"), (732, "EH"), (740, "SR"), (744, "SJ"), (748, "SZ"), (752, "SE"),
    (756, "CH"), (760, "SY"), (762, "TJ"), (764, "TH"), (768, "TG"), (772, "TK"),
    (776, "TO"), (780, "TT"), (784, "AE"), (788, "TN"), (792, "TR"), (795, "TM"),
    (796, "TC"), (798, "TV"), (800, "UG"), (804, "UA"), (807, "MK"), (818, "EG"),
    (826, "GB"), (831, "GG"), (832, "JE"), (833, "IM"), (834, "TZ"), (840, "US"),
    (850, "VI"), (854, "BF"), (858, "UY"), (860, "UZ"), (862, "VE"), (876, "WF"),
    (882, "WS"), (887, "YE"), (894, "ZM"),
];
