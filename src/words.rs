//! Built-in word lists and secret word selection

use crate::types::{Settings, WordMode};
use rand::seq::IndexedRandom;
use rand::Rng;

pub const DEFAULT_CATEGORY: &str = "animals";

const CATEGORIES: &[(&str, &[&str])] = &[
    (
        "animals",
        &[
            "Elephant", "Giraffe", "Dolphin", "Butterfly", "Eagle", "Lion", "Penguin",
            "Crocodile", "Tiger", "Panda", "Polar Bear", "Koala", "Rhino", "Zebra", "Flamingo",
            "Parrot", "Owl", "Fox", "Wolf", "Hedgehog", "Octopus", "Jellyfish", "Turtle",
            "Kangaroo", "Bat",
        ],
    ),
    (
        "objects",
        &[
            "Book", "Lamp", "Umbrella", "Glasses", "Telephone", "Guitar", "Camera", "Clock",
            "Chair", "Mirror", "Candle", "Radio", "Keyboard", "Headphones", "Backpack",
            "Suitcase", "Scarf", "Toothbrush", "Towel", "Scissors", "Compass", "Globe",
            "Envelope", "Flashlight", "Pencil",
        ],
    ),
    (
        "places",
        &[
            "Beach", "Library", "Restaurant", "Museum", "Airport", "Park", "Cinema",
            "Train Station", "School", "Hospital", "Supermarket", "Bank", "Hotel", "Theater",
            "Stadium", "Swimming Pool", "Zoo", "Aquarium", "Church", "Castle", "Lighthouse",
            "Desert", "Volcano", "Island", "Farm",
        ],
    ),
    (
        "food",
        &[
            "Pizza", "Sushi", "Pancake", "Burger", "Spaghetti", "Croissant", "Taco", "Curry",
            "Ice Cream", "Chocolate", "Popcorn", "Pretzel", "Lasagna", "Omelette", "Dumpling",
            "Waffle", "Soup", "Salad", "Cheese", "Banana", "Strawberry", "Avocado", "Honey",
            "Bread", "Doughnut",
        ],
    ),
    (
        "jobs",
        &[
            "Doctor", "Teacher", "Firefighter", "Pilot", "Chef", "Police Officer", "Farmer",
            "Astronaut", "Dentist", "Lawyer", "Plumber", "Electrician", "Journalist",
            "Photographer", "Baker", "Hairdresser", "Mechanic", "Nurse", "Architect", "Judge",
            "Librarian", "Gardener", "Carpenter", "Scientist", "Waiter",
        ],
    ),
];

/// Names of the built-in categories
pub fn categories() -> impl Iterator<Item = &'static str> {
    CATEGORIES.iter().map(|(name, _)| *name)
}

/// Built-in spelling of a category name, matched case-insensitively
pub fn known_category(name: &str) -> Option<&'static str> {
    categories().find(|c| c.eq_ignore_ascii_case(name.trim()))
}

/// Words of a category, falling back to the default category for unknown names
pub fn category_words(category: &str) -> &'static [&'static str] {
    let category = known_category(category).unwrap_or(DEFAULT_CATEGORY);
    CATEGORIES
        .iter()
        .find(|(name, _)| *name == category)
        .map(|(_, words)| *words)
        .unwrap_or(&[])
}

/// Normalize a word for comparison (trim whitespace, lowercase)
pub fn normalize(word: &str) -> String {
    word.trim().to_lowercase()
}

pub fn same_word(a: &str, b: &str) -> bool {
    normalize(a) == normalize(b)
}

/// Pick a secret word for the given settings.
///
/// Custom mode draws from the custom list when it has any usable entries,
/// otherwise from the configured category. `exclude` removes one word from the
/// candidates (compared case-insensitively); if nothing else is left, the
/// default category is used instead.
pub fn pick_word<R: Rng + ?Sized>(settings: &Settings, exclude: Option<&str>, rng: &mut R) -> String {
    let custom: Vec<&str> = settings
        .custom_words
        .iter()
        .map(|w| w.trim())
        .filter(|w| !w.is_empty())
        .collect();

    let pool: Vec<&str> = if settings.word_mode == WordMode::Custom && !custom.is_empty() {
        custom
    } else {
        category_words(&settings.category).to_vec()
    };

    let allowed = |word: &&str| !exclude.is_some_and(|ex| same_word(word, ex));

    let mut candidates: Vec<&str> = pool.into_iter().filter(allowed).collect();
    if candidates.is_empty() {
        candidates = category_words(DEFAULT_CATEGORY)
            .iter()
            .copied()
            .filter(allowed)
            .collect();
    }

    candidates
        .choose(rng)
        .map(|w| w.to_string())
        .unwrap_or_else(|| DEFAULT_CATEGORY.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn custom(words: &[&str]) -> Settings {
        Settings {
            word_mode: WordMode::Custom,
            category: "food".to_string(),
            custom_words: words.iter().map(|w| w.to_string()).collect(),
        }
    }

    #[test]
    fn test_unknown_category_falls_back_to_default() {
        assert_eq!(category_words("nope"), category_words(DEFAULT_CATEGORY));
        assert_eq!(category_words("FOOD"), category_words("food"));
    }

    #[test]
    fn test_pick_from_category() {
        let settings = Settings {
            category: "places".to_string(),
            ..Settings::default()
        };
        let word = pick_word(&settings, None, &mut rand::rng());
        assert!(category_words("places").contains(&word.as_str()));
    }

    #[test]
    fn test_pick_from_custom_list() {
        let settings = custom(&["  Rocket ", ""]);
        let word = pick_word(&settings, None, &mut rand::rng());
        assert_eq!(word, "Rocket");
    }

    #[test]
    fn test_empty_custom_list_uses_category() {
        let settings = custom(&[]);
        let word = pick_word(&settings, None, &mut rand::rng());
        assert!(category_words("food").contains(&word.as_str()));
    }

    #[test]
    fn test_pick_excludes_revealed_word() {
        let settings = custom(&["Rocket", "Comet"]);
        for _ in 0..20 {
            let word = pick_word(&settings, Some("rocket"), &mut rand::rng());
            assert_eq!(word, "Comet");
        }
    }

    #[test]
    fn test_single_custom_word_excluded_falls_back() {
        let settings = custom(&["Rocket"]);
        let word = pick_word(&settings, Some("Rocket"), &mut rand::rng());
        assert_ne!(word, "Rocket");
        assert!(category_words(DEFAULT_CATEGORY).contains(&word.as_str()));
    }

    #[test]
    fn test_same_word_ignores_case_and_whitespace() {
        assert!(same_word(" Tiger", "tiger "));
        assert!(!same_word("Tiger", "Tigers"));
        assert!(categories().any(|c| c == DEFAULT_CATEGORY));
        assert_eq!(known_category(" FOOD"), Some("food"));
        assert_eq!(known_category("dinosaurs"), None);
    }
}
