//! Instruction text and response schema for card extraction.
//!
//! The printed card layout is fixed, so the instruction tells the model
//! where each field sits rather than what the card game is.

use serde_json::{json, Value};

use crate::types::card::{CardType, Rarity};

/// User-turn text sent alongside the image.
pub const EXTRACTION_PROMPT: &str = "You are an expert at reading trading card information. \
Extract the requested fields from the provided card image exactly as printed.";

/// System instruction describing where each field is printed.
pub const EXTRACTION_INSTRUCTION: &str = r#"Extract the following five fields from the card image.
1. rarity: the letters in the top-left corner (one of N, R, SR, SSR)
2. cardType: the type label on the left edge (one of コスチューム, アクセサリー, サポート, SPアピール)
3. cardId: the code in the bottom-right corner starting with IMT (for example IMT-XX-XXX)
4. characterName: the character name at the top of the card, in Japanese
5. cardName: the text inside the black band near the centre, which has a coloured vertical bar on its left"#;

/// Fields the service must always return.
pub const REQUIRED_FIELDS: [&str; 3] = ["rarity", "cardType", "cardId"];

/// Response schema constraining the model to the five card fields.
pub fn extraction_schema() -> Value {
    let rarities: Vec<&str> = Rarity::ALL.iter().map(|r| r.as_str()).collect();
    let card_types: Vec<&str> = CardType::ALL.iter().map(|t| t.printed_label()).collect();

    json!({
        "type": "object",
        "properties": {
            "rarity": { "type": "string", "enum": rarities },
            "cardType": { "type": "string", "enum": card_types },
            "cardId": { "type": "string" },
            "cardName": { "type": "string" },
            "characterName": { "type": "string" }
        },
        "required": REQUIRED_FIELDS
    })
}
