//! Keyword rules for provider types and regions
//!
//! Rules are evaluated top to bottom and the first hit wins, so more specific
//! phrases sit above the general ones they contain ("physician assistant"
//! before "physician", "midwest" before "west").

/// Keyword test applied to a lower-cased, whitespace-collapsed value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    /// Substring anywhere in the value
    Phrase(&'static str),
    /// Whole word only; used for short abbreviations
    Word(&'static str),
}

impl Keyword {
    pub fn matches(self, text: &str) -> bool {
        match self {
            Keyword::Phrase(phrase) => text.contains(phrase),
            Keyword::Word(word) => text
                .split(|c: char| !c.is_alphanumeric())
                .any(|token| token == word),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct KeywordRule {
    pub keywords: &'static [Keyword],
    pub canonical: &'static str,
}

pub const PROVIDER_TYPE_RULES: &[KeywordRule] = &[
    KeywordRule {
        keywords: &[Keyword::Phrase("nurse practitioner"), Keyword::Word("np"), Keyword::Word("aprn")],
        canonical: "Nurse Practitioner",
    },
    KeywordRule {
        keywords: &[Keyword::Phrase("physician assistant"), Keyword::Word("pa")],
        canonical: "Physician Assistant",
    },
    KeywordRule {
        keywords: &[Keyword::Phrase("crna"), Keyword::Phrase("nurse anesthetist")],
        canonical: "CRNA",
    },
    KeywordRule {
        keywords: &[Keyword::Phrase("advanced practice"), Keyword::Word("app")],
        canonical: "Advanced Practice Provider",
    },
    KeywordRule {
        keywords: &[
            Keyword::Phrase("physician"),
            Keyword::Word("md"),
            Keyword::Word("do"),
            Keyword::Word("staff"),
        ],
        canonical: "Physician",
    },
];

pub const REGION_RULES: &[KeywordRule] = &[
    KeywordRule {
        keywords: &[
            Keyword::Phrase("national"),
            Keyword::Phrase("all regions"),
            Keyword::Phrase("united states"),
            Keyword::Word("us"),
            Keyword::Word("total"),
        ],
        canonical: "National",
    },
    KeywordRule {
        keywords: &[Keyword::Phrase("northeast"), Keyword::Phrase("north east"), Keyword::Phrase("eastern")],
        canonical: "Northeast",
    },
    KeywordRule {
        keywords: &[
            Keyword::Phrase("southeast"),
            Keyword::Phrase("south east"),
            Keyword::Phrase("southern"),
            Keyword::Word("south"),
        ],
        canonical: "South",
    },
    KeywordRule {
        keywords: &[
            Keyword::Phrase("midwest"),
            Keyword::Phrase("mid west"),
            Keyword::Phrase("north central"),
            Keyword::Word("central"),
        ],
        canonical: "Midwest",
    },
    KeywordRule {
        keywords: &[
            Keyword::Phrase("west"),
            Keyword::Phrase("pacific"),
            Keyword::Phrase("mountain"),
        ],
        canonical: "West",
    },
];

/// Canonical name of the first rule matching `normalized`
pub fn match_rules(rules: &[KeywordRule], normalized: &str) -> Option<&'static str> {
    rules
        .iter()
        .find(|rule| rule.keywords.iter().any(|k| k.matches(normalized)))
        .map(|rule| rule.canonical)
}
