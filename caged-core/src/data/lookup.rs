//! Static code → label tables.
//!
//! These are configuration data taken from the official classifications:
//! CNAE 2.0 sections (A–U), IBGE municipality codes (6-digit form used by
//! CAGED, without the check digit) and the CAGED sex codes.

/// Label for any unmapped sector or gender code.
pub const OTHER_LABEL: &str = "Other";

/// CNAE 2.0 sections.
pub const CNAE_SECTIONS: &[(&str, &str)] = &[
    ("A", "Agricultura"),
    ("B", "Extrativa"),
    ("C", "Indústria"),
    ("D", "Eletricidade/Gás"),
    ("E", "Água/Esgoto"),
    ("F", "Construção"),
    ("G", "Comércio"),
    ("H", "Transporte"),
    ("I", "Alojamento/Alim."),
    ("J", "Tecnologia"),
    ("K", "Financeiro"),
    ("L", "Imobiliário"),
    ("M", "Profissional/Cient."),
    ("N", "Administrativo"),
    ("O", "Adm. Pública"),
    ("P", "Educação"),
    ("Q", "Saúde"),
    ("R", "Artes"),
    ("S", "Outros Serviços"),
    ("T", "Domésticos"),
    ("U", "Internacionais"),
];

/// State capitals plus the Porto Alegre metropolitan municipalities the
/// dashboard features.
pub const MUNICIPALITIES: &[(&str, &str)] = &[
    ("110020", "Porto Velho (RO)"),
    ("120040", "Rio Branco (AC)"),
    ("130260", "Manaus (AM)"),
    ("140010", "Boa Vista (RR)"),
    ("150140", "Belém (PA)"),
    ("160030", "Macapá (AP)"),
    ("172100", "Palmas (TO)"),
    ("211130", "São Luís (MA)"),
    ("221100", "Teresina (PI)"),
    ("230440", "Fortaleza (CE)"),
    ("240810", "Natal (RN)"),
    ("250750", "João Pessoa (PB)"),
    ("261160", "Recife (PE)"),
    ("270430", "Maceió (AL)"),
    ("280030", "Aracaju (SE)"),
    ("292740", "Salvador (BA)"),
    ("310620", "Belo Horizonte (MG)"),
    ("320530", "Vitória (ES)"),
    ("330455", "Rio de Janeiro (RJ)"),
    ("355030", "São Paulo (SP)"),
    ("410690", "Curitiba (PR)"),
    ("420540", "Florianópolis (SC)"),
    ("430460", "Canoas (RS)"),
    ("431490", "Porto Alegre (RS)"),
    ("500270", "Campo Grande (MS)"),
    ("510340", "Cuiabá (MT)"),
    ("520870", "Goiânia (GO)"),
    ("530010", "Brasília (DF)"),
];

/// CAGED sex codes; older releases used letters.
pub const GENDERS: &[(&str, &str)] = &[
    ("1", "Masculino"),
    ("3", "Feminino"),
    ("M", "Masculino"),
    ("F", "Feminino"),
];

fn lookup(table: &'static [(&'static str, &'static str)], code: &str) -> Option<&'static str> {
    let code = code.trim();
    table.iter().find(|(c, _)| *c == code).map(|(_, label)| *label)
}

/// Sector label for a CNAE section letter; unmapped codes are [`OTHER_LABEL`].
pub fn sector_label(code: &str) -> &'static str {
    lookup(CNAE_SECTIONS, code).unwrap_or(OTHER_LABEL)
}

/// Municipality label; unmapped codes pass through unchanged (trimmed).
pub fn municipality_label(code: &str) -> String {
    lookup(MUNICIPALITIES, code)
        .map(str::to_string)
        .unwrap_or_else(|| code.trim().to_string())
}

/// Gender label; unmapped codes are [`OTHER_LABEL`].
pub fn gender_label(code: &str) -> &'static str {
    lookup(GENDERS, code).unwrap_or(OTHER_LABEL)
}
