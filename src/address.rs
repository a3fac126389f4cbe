use deunicode::deunicode;

use crate::models::AddressParts;

/// Resolves a freeform "neighborhood, city" string against the known
/// name lists from configuration.
///
/// Matching is ASCII-folded, lowercased substring search; the first
/// name in list order wins, not the longest or leftmost match. A
/// shorter name earlier in the list can therefore shadow a longer one
/// that contains it — known limitation, kept on purpose.
pub struct AddressResolver {
    neighborhoods: Vec<String>,
    cities: Vec<String>,
}

impl AddressResolver {
    /// Lists are folded once here so `resolve` only does the scan.
    pub fn new(neighborhoods: &[String], cities: &[String]) -> Self {
        let fold = |names: &[String]| {
            names
                .iter()
                .map(|n| deunicode(&n.to_lowercase()))
                .collect()
        };
        Self {
            neighborhoods: fold(neighborhoods),
            cities: fold(cities),
        }
    }

    pub fn resolve(&self, freeform: &str) -> (Option<String>, Option<String>) {
        let folded = deunicode(&freeform.to_lowercase());
        (
            find_in(&folded, &self.neighborhoods),
            find_in(&folded, &self.cities),
        )
    }

    /// Convenience for adapters: street from the card, locality text
    /// through the resolver.
    pub fn parts(&self, street: String, locality: &str) -> AddressParts {
        let (neighborhood, city) = self.resolve(locality);
        AddressParts {
            street,
            neighborhood,
            city,
        }
    }
}

fn find_in(folded: &str, names: &[String]) -> Option<String> {
    names.iter().find(|name| folded.contains(name.as_str())).cloned()
}
