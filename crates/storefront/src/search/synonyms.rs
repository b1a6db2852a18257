//! Multilingual synonym table.
//!
//! Each group collects equivalent terms in English, Indonesian/Malay, Spanish
//! and French. Groups that name a product type carry its category.

use aurelia_core::ProductCategory;

/// A set of interchangeable search terms.
#[derive(Debug)]
pub struct SynonymGroup {
    pub category: Option<ProductCategory>,
    pub terms: &'static [&'static str],
}

pub static GROUPS: &[SynonymGroup] = &[
    SynonymGroup {
        category: Some(ProductCategory::Rings),
        terms: &["ring", "rings", "cincin", "anillo", "anillos", "bague", "bagues"],
    },
    SynonymGroup {
        category: Some(ProductCategory::Necklaces),
        terms: &[
            "necklace", "necklaces", "kalung", "collar", "collares", "collier", "colliers",
        ],
    },
    SynonymGroup {
        category: Some(ProductCategory::Bracelets),
        terms: &["bracelet", "bracelets", "gelang", "pulsera", "pulseras"],
    },
    SynonymGroup {
        category: Some(ProductCategory::Earrings),
        terms: &[
            "earring", "earrings", "anting", "pendientes", "aretes", "boucles",
        ],
    },
    SynonymGroup {
        category: Some(ProductCategory::Pendants),
        terms: &[
            "pendant", "pendants", "liontin", "colgante", "colgantes", "pendentif", "pendentifs",
        ],
    },
    SynonymGroup {
        category: Some(ProductCategory::Watches),
        terms: &["watch", "watches", "jam", "reloj", "relojes", "montre", "montres"],
    },
    SynonymGroup {
        category: None,
        terms: &["gold", "emas", "oro", "or"],
    },
    SynonymGroup {
        category: None,
        terms: &["silver", "perak", "plata", "argent"],
    },
    SynonymGroup {
        category: None,
        terms: &[
            "diamond", "diamonds", "berlian", "diamante", "diamantes", "diamant", "diamants",
        ],
    },
    SynonymGroup {
        category: None,
        terms: &["pearl", "pearls", "mutiara", "perla", "perlas", "perle", "perles"],
    },
    SynonymGroup {
        category: None,
        terms: &["rose", "mawar", "rosa"],
    },
    SynonymGroup {
        category: None,
        terms: &["white", "putih", "blanco", "blanc"],
    },
    SynonymGroup {
        category: None,
        terms: &["platinum", "platino", "platine"],
    },
];

/// The group containing `term`, if any. `term` must already be lower-cased.
#[must_use]
pub fn group_for(term: &str) -> Option<&'static SynonymGroup> {
    GROUPS.iter().find(|g| g.terms.contains(&term))
}
