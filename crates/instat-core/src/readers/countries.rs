//! Country names and codes as they appear on invoice address blocks.

use super::patterns::{ALPHA_PREFIX, FIVE_DIGITS};
use super::profile::CodeOverride;

struct Country {
    alpha2: &'static str,
    alpha3: &'static str,
    names: &'static [&'static str],
}

const fn country(alpha2: &'static str, alpha3: &'static str, names: &'static [&'static str]) -> Country {
    Country { alpha2, alpha3, names }
}

/// ISO 3166-1 countries with English and French names, accented and
/// plain; the first name is the English short name.
static COUNTRIES: &[Country] = &[
    country("AF", "AFG", &["Afghanistan"]),
    country("AX", "ALA", &["Åland Islands", "Aland Islands", "Îles Åland", "Iles Aland"]),
    country("AL", "ALB", &["Albania", "Albanie"]),
    country("DZ", "DZA", &["Algeria", "Algérie", "Algerie"]),
    country("AS", "ASM", &["American Samoa", "Samoa américaines", "Samoa americaines"]),
    country("AD", "AND", &["Andorra", "Andorre"]),
    country("AO", "AGO", &["Angola"]),
    country("AI", "AIA", &["Anguilla"]),
    country("AQ", "ATA", &["Antarctica", "Antarctique"]),
    country("AG", "ATG", &["Antigua and Barbuda", "Antigua-et-Barbuda"]),
    country("AR", "ARG", &["Argentina", "Argentine"]),
    country("AM", "ARM", &["Armenia", "Arménie", "Armenie"]),
    country("AW", "ABW", &["Aruba"]),
    country("AU", "AUS", &["Australia", "Australie"]),
    country("AT", "AUT", &["Austria", "Autriche"]),
    country("AZ", "AZE", &["Azerbaijan", "Azerbaïdjan", "Azerbaidjan"]),
    country("BS", "BHS", &["Bahamas"]),
    country("BH", "BHR", &["Bahrain", "Bahreïn", "Bahrein"]),
    country("BD", "BGD", &["Bangladesh"]),
    country("BB", "BRB", &["Barbados", "Barbade"]),
    country("BY", "BLR", &["Belarus", "Biélorussie", "Bielorussie", "Bélarus"]),
    country("BE", "BEL", &["Belgium", "Belgique"]),
    country("BZ", "BLZ", &["Belize"]),
    country("BJ", "BEN", &["Benin", "Bénin"]),
    country("BM", "BMU", &["Bermuda", "Bermudes"]),
    country("BT", "BTN", &["Bhutan", "Bhoutan"]),
    country("BO", "BOL", &["Bolivia, Plurinational State of", "Bolivia", "Bolivie"]),
    country("BQ", "BES", &["Bonaire, Sint Eustatius and Saba", "Bonaire, Saint-Eustache et Saba"]),
    country("BA", "BIH", &["Bosnia and Herzegovina", "Bosnie-Herzégovine", "Bosnie-Herzegovine"]),
    country("BW", "BWA", &["Botswana"]),
    country("BV", "BVT", &["Bouvet Island", "Île Bouvet", "Ile Bouvet"]),
    country("BR", "BRA", &["Brazil", "Brésil", "Bresil"]),
    country(
        "IO",
        "IOT",
        &[
            "British Indian Ocean Territory",
            "Territoire britannique de l'océan Indien",
            "Territoire britannique de l'ocean Indien",
        ],
    ),
    country("BN", "BRN", &["Brunei Darussalam", "Brunei", "Brunéi Darussalam"]),
    country("BG", "BGR", &["Bulgaria", "Bulgarie"]),
    country("BF", "BFA", &["Burkina Faso"]),
    country("BI", "BDI", &["Burundi"]),
    country("CV", "CPV", &["Cabo Verde", "Cape Verde", "Cap-Vert"]),
    country("KH", "KHM", &["Cambodia", "Cambodge"]),
    country("CM", "CMR", &["Cameroon", "Cameroun"]),
    country("CA", "CAN", &["Canada"]),
    country("KY", "CYM", &["Cayman Islands", "Îles Caïmans", "Iles Caimans"]),
    country(
        "CF",
        "CAF",
        &["Central African Republic", "République centrafricaine", "Republique centrafricaine", "Centrafrique"],
    ),
    country("TD", "TCD", &["Chad", "Tchad"]),
    country("CL", "CHL", &["Chile", "Chili"]),
    country("CN", "CHN", &["China", "Chine"]),
    country("CX", "CXR", &["Christmas Island", "Île Christmas", "Ile Christmas"]),
    country("CC", "CCK", &["Cocos (Keeling) Islands", "Îles Cocos", "Iles Cocos"]),
    country("CO", "COL", &["Colombia", "Colombie"]),
    country("KM", "COM", &["Comoros", "Comores"]),
    country("CG", "COG", &["Congo"]),
    country(
        "CD",
        "COD",
        &[
            "Congo, The Democratic Republic of the",
            "Democratic Republic of the Congo",
            "République démocratique du Congo",
            "Republique democratique du Congo",
        ],
    ),
    country("CK", "COK", &["Cook Islands", "Îles Cook", "Iles Cook"]),
    country("CR", "CRI", &["Costa Rica"]),
    country("CI", "CIV", &["Côte d'Ivoire", "Cote d'Ivoire", "Ivory Coast"]),
    country("HR", "HRV", &["Croatia", "Croatie"]),
    country("CU", "CUB", &["Cuba"]),
    country("CW", "CUW", &["Curaçao", "Curacao"]),
    country("CY", "CYP", &["Cyprus", "Chypre"]),
    country(
        "CZ",
        "CZE",
        &["Czechia", "Czech Republic", "Tchéquie", "Tchequie", "République tchèque", "Republique tcheque"],
    ),
    country("DK", "DNK", &["Denmark", "Danemark"]),
    country("DJ", "DJI", &["Djibouti"]),
    country("DM", "DMA", &["Dominica", "Dominique"]),
    country("DO", "DOM", &["Dominican Republic", "République dominicaine", "Republique dominicaine"]),
    country("EC", "ECU", &["Ecuador", "Équateur", "Equateur"]),
    country("EG", "EGY", &["Egypt", "Égypte", "Egypte"]),
    country("SV", "SLV", &["El Salvador", "Salvador"]),
    country("GQ", "GNQ", &["Equatorial Guinea", "Guinée équatoriale", "Guinee equatoriale"]),
    country("ER", "ERI", &["Eritrea", "Érythrée", "Erythree"]),
    country("EE", "EST", &["Estonia", "Estonie"]),
    country("SZ", "SWZ", &["Eswatini", "Swaziland"]),
    country("ET", "ETH", &["Ethiopia", "Éthiopie", "Ethiopie"]),
    country("FK", "FLK", &["Falkland Islands (Malvinas)", "Falkland Islands", "Îles Malouines", "Iles Malouines"]),
    country("FO", "FRO", &["Faroe Islands", "Îles Féroé", "Iles Feroe"]),
    country("FJ", "FJI", &["Fiji", "Fidji"]),
    country("FI", "FIN", &["Finland", "Finlande"]),
    country("FR", "FRA", &["France"]),
    country("GF", "GUF", &["French Guiana", "Guyane", "Guyane française", "Guyane francaise"]),
    country("PF", "PYF", &["French Polynesia", "Polynésie française", "Polynesie francaise"]),
    country(
        "TF",
        "ATF",
        &["French Southern Territories", "Terres australes françaises", "Terres australes francaises"],
    ),
    country("GA", "GAB", &["Gabon"]),
    country("GM", "GMB", &["Gambia", "Gambie"]),
    country("GE", "GEO", &["Georgia", "Géorgie", "Georgie"]),
    country("DE", "DEU", &["Germany", "Allemagne"]),
    country("GH", "GHA", &["Ghana"]),
    country("GI", "GIB", &["Gibraltar"]),
    country("GR", "GRC", &["Greece", "Grèce", "Grece"]),
    country("GL", "GRL", &["Greenland", "Groenland"]),
    country("GD", "GRD", &["Grenada", "Grenade"]),
    country("GP", "GLP", &["Guadeloupe"]),
    country("GU", "GUM", &["Guam"]),
    country("GT", "GTM", &["Guatemala"]),
    country("GG", "GGY", &["Guernsey", "Guernesey"]),
    country("GN", "GIN", &["Guinea", "Guinée", "Guinee"]),
    country("GW", "GNB", &["Guinea-Bissau", "Guinée-Bissau", "Guinee-Bissau"]),
    country("GY", "GUY", &["Guyana"]),
    country("HT", "HTI", &["Haiti", "Haïti"]),
    country(
        "HM",
        "HMD",
        &["Heard Island and McDonald Islands", "Îles Heard-et-MacDonald", "Iles Heard-et-MacDonald"],
    ),
    country("VA", "VAT", &["Holy See (Vatican City State)", "Vatican", "Saint-Siège", "Saint-Siege"]),
    country("HN", "HND", &["Honduras"]),
    country("HK", "HKG", &["Hong Kong"]),
    country("HU", "HUN", &["Hungary", "Hongrie"]),
    country("IS", "ISL", &["Iceland", "Islande"]),
    country("IN", "IND", &["India", "Inde"]),
    country("ID", "IDN", &["Indonesia", "Indonésie", "Indonesie"]),
    country("IR", "IRN", &["Iran, Islamic Republic of", "Iran"]),
    country("IQ", "IRQ", &["Iraq", "Irak"]),
    country("IE", "IRL", &["Ireland", "Irlande"]),
    country("IM", "IMN", &["Isle of Man", "Île de Man", "Ile de Man"]),
    country("IL", "ISR", &["Israel", "Israël"]),
    country("IT", "ITA", &["Italy", "Italie"]),
    country("JM", "JAM", &["Jamaica", "Jamaïque", "Jamaique"]),
    country("JP", "JPN", &["Japan", "Japon"]),
    country("JE", "JEY", &["Jersey"]),
    country("JO", "JOR", &["Jordan", "Jordanie"]),
    country("KZ", "KAZ", &["Kazakhstan"]),
    country("KE", "KEN", &["Kenya"]),
    country("KI", "KIR", &["Kiribati"]),
    country(
        "KP",
        "PRK",
        &["Korea, Democratic People's Republic of", "North Korea", "Corée du Nord", "Coree du Nord"],
    ),
    country("KR", "KOR", &["Korea, Republic of", "South Korea", "Corée du Sud", "Coree du Sud"]),
    country("KW", "KWT", &["Kuwait", "Koweït", "Koweit"]),
    country("KG", "KGZ", &["Kyrgyzstan", "Kirghizistan"]),
    country("LA", "LAO", &["Lao People's Democratic Republic", "Laos"]),
    country("LV", "LVA", &["Latvia", "Lettonie"]),
    country("LB", "LBN", &["Lebanon", "Liban"]),
    country("LS", "LSO", &["Lesotho"]),
    country("LR", "LBR", &["Liberia", "Libéria"]),
    country("LY", "LBY", &["Libya", "Libye"]),
    country("LI", "LIE", &["Liechtenstein"]),
    country("LT", "LTU", &["Lithuania", "Lituanie"]),
    country("LU", "LUX", &["Luxembourg"]),
    country("MO", "MAC", &["Macao", "Macau"]),
    country("MG", "MDG", &["Madagascar"]),
    country("MW", "MWI", &["Malawi"]),
    country("MY", "MYS", &["Malaysia", "Malaisie"]),
    country("MV", "MDV", &["Maldives"]),
    country("ML", "MLI", &["Mali"]),
    country("MT", "MLT", &["Malta", "Malte"]),
    country("MH", "MHL", &["Marshall Islands", "Îles Marshall", "Iles Marshall"]),
    country("MQ", "MTQ", &["Martinique"]),
    country("MR", "MRT", &["Mauritania", "Mauritanie"]),
    country("MU", "MUS", &["Mauritius", "Maurice"]),
    country("YT", "MYT", &["Mayotte"]),
    country("MX", "MEX", &["Mexico", "Mexique"]),
    country("FM", "FSM", &["Micronesia, Federated States of", "Micronesia", "Micronésie", "Micronesie"]),
    country("MD", "MDA", &["Moldova, Republic of", "Moldova", "Moldavie"]),
    country("MC", "MCO", &["Monaco"]),
    country("MN", "MNG", &["Mongolia", "Mongolie"]),
    country("ME", "MNE", &["Montenegro", "Monténégro"]),
    country("MS", "MSR", &["Montserrat"]),
    country("MA", "MAR", &["Morocco", "Maroc"]),
    country("MZ", "MOZ", &["Mozambique"]),
    country("MM", "MMR", &["Myanmar", "Birmanie"]),
    country("NA", "NAM", &["Namibia", "Namibie"]),
    country("NR", "NRU", &["Nauru"]),
    country("NP", "NPL", &["Nepal", "Népal"]),
    country("NL", "NLD", &["Netherlands", "Pays-Bas"]),
    country("NC", "NCL", &["New Caledonia", "Nouvelle-Calédonie", "Nouvelle-Caledonie"]),
    country("NZ", "NZL", &["New Zealand", "Nouvelle-Zélande", "Nouvelle-Zelande"]),
    country("NI", "NIC", &["Nicaragua"]),
    country("NE", "NER", &["Niger"]),
    country("NG", "NGA", &["Nigeria", "Nigéria"]),
    country("NU", "NIU", &["Niue"]),
    country("NF", "NFK", &["Norfolk Island", "Île Norfolk", "Ile Norfolk"]),
    country("MK", "MKD", &["North Macedonia", "Macédoine du Nord", "Macedoine du Nord"]),
    country("MP", "MNP", &["Northern Mariana Islands", "Îles Mariannes du Nord", "Iles Mariannes du Nord"]),
    country("NO", "NOR", &["Norway", "Norvège", "Norvege"]),
    country("OM", "OMN", &["Oman"]),
    country("PK", "PAK", &["Pakistan"]),
    country("PW", "PLW", &["Palau", "Palaos"]),
    country("PS", "PSE", &["Palestine, State of", "Palestine"]),
    country("PA", "PAN", &["Panama"]),
    country("PG", "PNG", &["Papua New Guinea", "Papouasie-Nouvelle-Guinée", "Papouasie-Nouvelle-Guinee"]),
    country("PY", "PRY", &["Paraguay"]),
    country("PE", "PER", &["Peru", "Pérou", "Perou"]),
    country("PH", "PHL", &["Philippines"]),
    country("PN", "PCN", &["Pitcairn"]),
    country("PL", "POL", &["Poland", "Pologne"]),
    country("PT", "PRT", &["Portugal"]),
    country("PR", "PRI", &["Puerto Rico", "Porto Rico"]),
    country("QA", "QAT", &["Qatar"]),
    country("RE", "REU", &["Réunion", "Reunion", "La Réunion", "La Reunion"]),
    country("RO", "ROU", &["Romania", "Roumanie"]),
    country("RU", "RUS", &["Russian Federation", "Russia", "Russie"]),
    country("RW", "RWA", &["Rwanda"]),
    country("BL", "BLM", &["Saint Barthélemy", "Saint Barthelemy", "Saint-Barthélemy", "Saint-Barthelemy"]),
    country(
        "SH",
        "SHN",
        &["Saint Helena, Ascension and Tristan da Cunha", "Saint Helena", "Sainte-Hélène", "Sainte-Helene"],
    ),
    country("KN", "KNA", &["Saint Kitts and Nevis", "Saint-Christophe-et-Niévès", "Saint-Christophe-et-Nieves"]),
    country("LC", "LCA", &["Saint Lucia", "Sainte-Lucie"]),
    country("MF", "MAF", &["Saint Martin (French part)", "Saint Martin", "Saint-Martin"]),
    country("PM", "SPM", &["Saint Pierre and Miquelon", "Saint-Pierre-et-Miquelon"]),
    country("VC", "VCT", &["Saint Vincent and the Grenadines", "Saint-Vincent-et-les-Grenadines"]),
    country("WS", "WSM", &["Samoa"]),
    country("SM", "SMR", &["San Marino", "Saint-Marin"]),
    country("ST", "STP", &["Sao Tome and Principe", "Sao Tomé-et-Principe", "Sao Tome-et-Principe"]),
    country("SA", "SAU", &["Saudi Arabia", "Arabie saoudite"]),
    country("SN", "SEN", &["Senegal", "Sénégal"]),
    country("RS", "SRB", &["Serbia", "Serbie"]),
    country("SC", "SYC", &["Seychelles"]),
    country("SL", "SLE", &["Sierra Leone"]),
    country("SG", "SGP", &["Singapore", "Singapour"]),
    country(
        "SX",
        "SXM",
        &[
            "Sint Maarten (Dutch part)",
            "Sint Maarten",
            "Saint-Martin (partie néerlandaise)",
            "Saint-Martin (partie neerlandaise)",
        ],
    ),
    country("SK", "SVK", &["Slovakia", "Slovaquie"]),
    country("SI", "SVN", &["Slovenia", "Slovénie", "Slovenie"]),
    country("SB", "SLB", &["Solomon Islands", "Îles Salomon", "Iles Salomon"]),
    country("SO", "SOM", &["Somalia", "Somalie"]),
    country("ZA", "ZAF", &["South Africa", "Afrique du Sud"]),
    country(
        "GS",
        "SGS",
        &[
            "South Georgia and the South Sandwich Islands",
            "Géorgie du Sud-et-les Îles Sandwich du Sud",
            "Georgie du Sud-et-les Iles Sandwich du Sud",
        ],
    ),
    country("SS", "SSD", &["South Sudan", "Soudan du Sud"]),
    country("ES", "ESP", &["Spain", "Espagne"]),
    country("LK", "LKA", &["Sri Lanka"]),
    country("SD", "SDN", &["Sudan", "Soudan"]),
    country("SR", "SUR", &["Suriname"]),
    country("SJ", "SJM", &["Svalbard and Jan Mayen", "Svalbard et Jan Mayen"]),
    country("SE", "SWE", &["Sweden", "Suède", "Suede"]),
    country("CH", "CHE", &["Switzerland", "Suisse"]),
    country("SY", "SYR", &["Syrian Arab Republic", "Syria", "Syrie"]),
    country("TW", "TWN", &["Taiwan, Province of China", "Taiwan", "Taïwan"]),
    country("TJ", "TJK", &["Tajikistan", "Tadjikistan"]),
    country("TZ", "TZA", &["Tanzania, United Republic of", "Tanzania", "Tanzanie"]),
    country("TH", "THA", &["Thailand", "Thaïlande", "Thailande"]),
    country("TL", "TLS", &["Timor-Leste", "East Timor", "Timor oriental"]),
    country("TG", "TGO", &["Togo"]),
    country("TK", "TKL", &["Tokelau"]),
    country("TO", "TON", &["Tonga"]),
    country("TT", "TTO", &["Trinidad and Tobago", "Trinité-et-Tobago", "Trinite-et-Tobago"]),
    country("TN", "TUN", &["Tunisia", "Tunisie"]),
    country("TR", "TUR", &["Türkiye", "Turkiye", "Turkey", "Turquie"]),
    country("TM", "TKM", &["Turkmenistan", "Turkménistan"]),
    country("TC", "TCA", &["Turks and Caicos Islands", "Îles Turques-et-Caïques", "Iles Turques-et-Caiques"]),
    country("TV", "TUV", &["Tuvalu"]),
    country("UG", "UGA", &["Uganda", "Ouganda"]),
    country("UA", "UKR", &["Ukraine"]),
    country("AE", "ARE", &["United Arab Emirates", "Émirats arabes unis", "Emirats arabes unis"]),
    country("GB", "GBR", &["United Kingdom", "Royaume-Uni"]),
    country("US", "USA", &["United States", "États-Unis", "Etats-Unis"]),
    country(
        "UM",
        "UMI",
        &[
            "United States Minor Outlying Islands",
            "Îles mineures éloignées des États-Unis",
            "Iles mineures eloignees des Etats-Unis",
        ],
    ),
    country("UY", "URY", &["Uruguay"]),
    country("UZ", "UZB", &["Uzbekistan", "Ouzbékistan", "Ouzbekistan"]),
    country("VU", "VUT", &["Vanuatu"]),
    country("VE", "VEN", &["Venezuela, Bolivarian Republic of", "Venezuela"]),
    country("VN", "VNM", &["Viet Nam", "Vietnam", "Viêt Nam"]),
    country("VG", "VGB", &["Virgin Islands, British", "Îles Vierges britanniques", "Iles Vierges britanniques"]),
    country("VI", "VIR", &["Virgin Islands, U.S.", "Îles Vierges des États-Unis", "Iles Vierges des Etats-Unis"]),
    country("WF", "WLF", &["Wallis and Futuna", "Wallis-et-Futuna"]),
    country("EH", "ESH", &["Western Sahara", "Sahara occidental"]),
    country("YE", "YEM", &["Yemen", "Yémen"]),
    country("ZM", "ZMB", &["Zambia", "Zambie"]),
    country("ZW", "ZWE", &["Zimbabwe"]),
];

fn same(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

fn by_name(name: &str) -> Option<&'static Country> {
    let name = name.trim();
    COUNTRIES.iter().find(|c| c.names.iter().any(|n| same(n, name)))
}

/// Whether an address line names a country, either as a whole or by its
/// first word (`ESPAGNE 28001`).
pub fn is_country_line(text: &str) -> bool {
    let text = text.trim();
    if text.is_empty() {
        return false;
    }
    by_name(text).is_some() || text.split_whitespace().next().and_then(by_name).is_some()
}

/// ISO alpha-2 code for a country name or code.
pub fn code_for_name(name: &str) -> Option<&'static str> {
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    COUNTRIES
        .iter()
        .find(|c| same(c.alpha2, name) || same(c.alpha3, name) || c.names.iter().any(|n| same(n, name)))
        .map(|c| c.alpha2)
}

/// Country code implied by a VAT number: an override whose prefix the VAT
/// starts with, else its leading letters; bare five-digit numbers are
/// domestic.
pub fn vat_country(vat: &str, overrides: &[CodeOverride]) -> Option<String> {
    let vat = vat.trim();
    if let Some(o) = overrides.iter().find(|o| vat.starts_with(o.from.as_str())) {
        return Some(o.to.clone());
    }
    if let Some(prefix) = ALPHA_PREFIX.find(vat) {
        return Some(prefix.as_str().to_string());
    }
    if FIVE_DIGITS.is_match(vat) {
        return Some("FR".to_string());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_country_lines() {
        assert!(is_country_line("ESPAGNE"));
        assert!(is_country_line("Spain 28001"));
        assert!(is_country_line("  PAYS-BAS "));
        assert!(!is_country_line("12 RUE DE LA PAIX"));
        assert!(!is_country_line(""));
    }

    #[test]
    fn test_code_for_name() {
        assert_eq!(code_for_name("Italie"), Some("IT"));
        assert_eq!(code_for_name("GERMANY"), Some("DE"));
        assert_eq!(code_for_name("esp"), Some("ES"));
        assert_eq!(code_for_name("COREE DU SUD"), Some("KR"));
        assert_eq!(code_for_name("Atlantis"), None);
    }

    #[test]
    fn test_every_iso_country_is_known() {
        assert_eq!(COUNTRIES.len(), 249);
        assert_eq!(code_for_name("Iceland"), Some("IS"));
        assert_eq!(code_for_name("ISLANDE"), Some("IS"));
        assert_eq!(code_for_name("Liechtenstein"), Some("LI"));
        assert_eq!(code_for_name("SENEGAL"), Some("SN"));
        assert_eq!(code_for_name("Sénégal"), Some("SN"));
        assert_eq!(code_for_name("Viet Nam"), Some("VN"));
        assert_eq!(code_for_name("Côte d'Ivoire"), Some("CI"));
        assert_eq!(code_for_name("NZL"), Some("NZ"));
        assert!(is_country_line("ISLANDE 101"));
        assert!(is_country_line("ÉTATS-UNIS"));

        let mut codes: Vec<&str> = COUNTRIES.iter().map(|c| c.alpha2).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), COUNTRIES.len());
    }

    #[test]
    fn test_vat_country() {
        let overrides = vec![CodeOverride::new("ESB", "ES"), CodeOverride::new("ATU", "AT")];
        assert_eq!(vat_country("ESB12345678", &overrides).as_deref(), Some("ES"));
        assert_eq!(vat_country("ATU1234567", &overrides).as_deref(), Some("AT"));
        assert_eq!(vat_country("IT01234567890", &overrides).as_deref(), Some("IT"));
        assert_eq!(vat_country("75008", &[]).as_deref(), Some("FR"));
        assert_eq!(vat_country("123", &[]), None);
    }
}
