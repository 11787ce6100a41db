//! Fake line items used to fill the sample invoice.
//!
//! Every record is produced from a [`Dummy`]-derived template: a fruit name, a ten word lorem
//! ipsum sentence and a price between 1.00 and 10.00.  The randomness source is passed in by the
//! caller so tests can use a seeded [`StdRng`][rand::rngs::StdRng] while the binary keeps the
//! per-run variation of the thread-local generator.

use std::fmt;

use fake::faker::lorem::en::Sentence;
use fake::{Dummy, Fake, Faker};
use rand::seq::SliceRandom;
use rand::Rng;

/// Lowest generated price, in cents.
pub const MIN_PRICE_CENTS: u32 = 100;

/// Highest generated price, in cents.
pub const MAX_PRICE_CENTS: u32 = 1_000;

/// Number of words in a generated description.
pub const DESCRIPTION_WORDS: usize = 10;

const FRUITS: &[&str] = &[
    "Apple",
    "Apricot",
    "Avocado",
    "Banana",
    "Blackberry",
    "Blueberry",
    "Cantaloupe",
    "Cherry",
    "Coconut",
    "Cranberry",
    "Date",
    "Dragonfruit",
    "Durian",
    "Elderberry",
    "Fig",
    "Gooseberry",
    "Grape",
    "Grapefruit",
    "Guava",
    "Honeydew",
    "Jackfruit",
    "Kiwi",
    "Kumquat",
    "Lemon",
    "Lime",
    "Lychee",
    "Mango",
    "Mulberry",
    "Nectarine",
    "Orange",
    "Papaya",
    "Passionfruit",
    "Peach",
    "Pear",
    "Persimmon",
    "Pineapple",
    "Plum",
    "Pomegranate",
    "Quince",
    "Raspberry",
    "Starfruit",
    "Strawberry",
    "Tangerine",
    "Watermelon",
];

/// Faker that picks a name from the built-in fruit vocabulary.
pub struct FruitName;

impl Dummy<FruitName> for String {
    fn dummy_with_rng<R: Rng + ?Sized>(_: &FruitName, rng: &mut R) -> Self {
        FRUITS.choose(rng).copied().unwrap_or("Apple").to_string()
    }
}

/// A monetary amount stored as whole cents.
///
/// Displays with exactly two fractional digits, e.g. `7.35`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Price(u32);

impl Price {
    /// Creates a price from a number of cents.
    pub fn from_cents(cents: u32) -> Self {
        Self(cents)
    }

    /// Returns the price in cents.
    pub fn cents(self) -> u32 {
        self.0
    }

    /// Parses a `units.cents` string such as `2.00` or `12.5`.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim().trim_start_matches('$').trim();
        let (units, fraction) = match text.split_once('.') {
            Some((units, fraction)) => (units, fraction),
            None => (text, ""),
        };
        if units.is_empty() || fraction.len() > 2 {
            return None;
        }
        let digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if !digits(units) || !digits(fraction) {
            return None;
        }

        let units: u32 = units.parse().ok()?;
        let fraction: u32 = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<u32>().ok()? * 10,
            _ => fraction.parse().ok()?,
        };
        units.checked_mul(100)?.checked_add(fraction).map(Self)
    }

    /// Adds two prices, returning `None` on overflow.
    pub fn checked_add(self, other: Price) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    /// Sums `prices`, returning `None` on overflow.
    pub fn checked_sum(prices: impl IntoIterator<Item = Price>) -> Option<Self> {
        prices
            .into_iter()
            .try_fold(Price::default(), |total, price| total.checked_add(price))
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

#[derive(Debug, Dummy)]
struct FruitTemplate {
    #[dummy(faker = "FruitName")]
    name: String,
    #[dummy(faker = "Sentence(DESCRIPTION_WORDS..DESCRIPTION_WORDS + 1)")]
    description: String,
    #[dummy(faker = "MIN_PRICE_CENTS..=MAX_PRICE_CENTS")]
    price_cents: u32,
}

/// One generated invoice line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SampleItem {
    /// Fruit name.
    pub name: String,
    /// Short lorem ipsum description.
    pub description: String,
    /// Unit price.
    pub price: Price,
}

impl SampleItem {
    /// Converts the record into a `[name, description, price]` table row.
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.description.clone(),
            self.price.to_string(),
        ]
    }
}

impl From<FruitTemplate> for SampleItem {
    fn from(template: FruitTemplate) -> Self {
        Self {
            name: template.name,
            description: template.description,
            price: Price::from_cents(template.price_cents),
        }
    }
}

/// Generates `count` fake fruit records using `rng` as the randomness source.
pub fn generate<R: Rng + ?Sized>(count: usize, rng: &mut R) -> Vec<SampleItem> {
    (0..count)
        .map(|_| Faker.fake_with_rng::<FruitTemplate, R>(rng).into())
        .collect()
}

/// Generates `count` fake fruit records from the thread-local generator.
pub fn generate_unseeded(count: usize) -> Vec<SampleItem> {
    generate(count, &mut rand::thread_rng())
}

/// Converts generated records into table rows.
pub fn rows(items: &[SampleItem]) -> Vec<Vec<String>> {
    items.iter().map(SampleItem::to_row).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn is_two_decimal_price(text: &str) -> bool {
        match text.split_once('.') {
            Some((units, cents)) => {
                !units.is_empty()
                    && units.bytes().all(|b| b.is_ascii_digit())
                    && cents.len() == 2
                    && cents.bytes().all(|b| b.is_ascii_digit())
            }
            None => false,
        }
    }

    #[test]
    fn generates_requested_number_of_records() {
        let mut rng = StdRng::seed_from_u64(7);
        for count in [0, 1, 2, 25] {
            assert_eq!(generate(count, &mut rng).len(), count);
        }
    }

    #[test]
    fn zero_count_yields_empty_list() {
        assert!(generate_unseeded(0).is_empty());
    }

    #[test]
    fn records_have_text_and_formatted_prices() {
        let mut rng = StdRng::seed_from_u64(42);
        for item in generate(200, &mut rng) {
            assert!(!item.name.is_empty());
            assert!(FRUITS.contains(&item.name.as_str()));
            assert!(!item.description.trim().is_empty());
            assert_eq!(
                item.description.split_whitespace().count(),
                DESCRIPTION_WORDS
            );

            let price = item.price.to_string();
            assert!(is_two_decimal_price(&price), "bad price format {price}");
            assert!(item.price.cents() >= MIN_PRICE_CENTS);
            assert!(item.price.cents() <= MAX_PRICE_CENTS);
        }
    }

    #[test]
    fn seeded_generation_is_reproducible() {
        let a = generate(10, &mut StdRng::seed_from_u64(99));
        let b = generate(10, &mut StdRng::seed_from_u64(99));
        assert_eq!(a, b);
    }

    #[test]
    fn rows_have_three_fields() {
        let items = generate(3, &mut StdRng::seed_from_u64(1));
        let rows = rows(&items);
        assert_eq!(rows.len(), 3);
        for (row, item) in rows.iter().zip(&items) {
            assert_eq!(row.len(), 3);
            assert_eq!(row[0], item.name);
            assert_eq!(row[2], item.price.to_string());
        }
    }

    #[test]
    fn price_display_pads_cents() {
        assert_eq!(Price::from_cents(100).to_string(), "1.00");
        assert_eq!(Price::from_cents(1_005).to_string(), "10.05");
        assert_eq!(Price::from_cents(7).to_string(), "0.07");
    }

    #[test]
    fn price_parse_accepts_table_literals() {
        assert_eq!(Price::parse("2.00"), Some(Price::from_cents(200)));
        assert_eq!(Price::parse("$ 3.5"), Some(Price::from_cents(350)));
        assert_eq!(Price::parse("12"), Some(Price::from_cents(1_200)));
        assert_eq!(Price::parse("XXXX.00"), None);
        assert_eq!(Price::parse("1.234"), None);
        assert_eq!(Price::parse(""), None);
    }

    #[test]
    fn prices_sum_in_cents() {
        let total = Price::checked_sum([Price::from_cents(200), Price::from_cents(300)]);
        assert_eq!(total, Some(Price::from_cents(500)));
        assert_eq!(Price::checked_sum(Vec::new()), Some(Price::default()));
    }

    #[test]
    fn overflowing_sum_is_rejected() {
        let large = Price::parse("40000000.00").expect("fits in cents");
        assert_eq!(large.checked_add(large), None);
        assert_eq!(Price::checked_sum([large, large]), None);
    }
}
