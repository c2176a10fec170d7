// Static UI strings and the category catalogue, in English and Greek.

use crate::core_modules::listing::{Category, Language};
use serde::Serialize;
use std::sync::OnceLock;

/// Every label the directory UI needs, for one language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Labels {
    pub header_title: &'static str,
    pub search_placeholder: &'static str,
    pub all_categories: &'static str,
    pub near_me: &'static str,
    pub list: &'static str,
    pub map: &'static str,
    pub split: &'static str,
    pub no_listings: &'static str,
    pub call: &'static str,
    pub whatsapp: &'static str,
    pub email: &'static str,
    pub directions: &'static str,
    pub listings_in_area: &'static str,
    pub default_view: &'static str,
    pub satellite: &'static str,
    pub location_prompt: &'static str,
    pub sample_data_unconfigured: &'static str,
    pub sample_data_unreachable: &'static str,
}

const EN: Labels = Labels {
    header_title: "Local Greece",
    search_placeholder: "Search for experiences, workshops, tours...",
    all_categories: "Categories",
    near_me: "Near Me",
    list: "List",
    map: "Map",
    split: "Split",
    no_listings: "No listings found matching your criteria.",
    call: "Call",
    whatsapp: "WhatsApp",
    email: "Email",
    directions: "Get Directions",
    listings_in_area: "Listings in this area",
    default_view: "Default",
    satellite: "Satellite",
    location_prompt: "Please enable location services to use this feature.",
    sample_data_unconfigured: "The listing database is not configured. Displaying sample data.",
    sample_data_unreachable: "Could not connect to the database. Displaying sample data.",
};

const GR: Labels = Labels {
    header_title: "Ελλάδα Τοπικά",
    search_placeholder: "Αναζήτηση για εμπειρίες, εργαστήρια, περιηγήσεις...",
    all_categories: "Κατηγορίες",
    near_me: "Κοντά μου",
    list: "Λίστα",
    map: "Χάρτης",
    split: "Διαίρεση",
    no_listings: "Δεν βρέθηκαν καταχωρήσεις που να ταιριάζουν με τα κριτήριά σας.",
    call: "Κλήση",
    whatsapp: "WhatsApp",
    email: "Email",
    directions: "Λήψη οδηγιών",
    listings_in_area: "Καταχωρήσεις σε αυτήν την περιοχή",
    default_view: "Προεπιλογή",
    satellite: "Δορυφόρος",
    location_prompt: "Ενεργοποιήστε τις υπηρεσίες τοποθεσίας για να χρησιμοποιήσετε αυτή τη λειτουργία.",
    sample_data_unconfigured: "Η βάση δεδομένων δεν έχει ρυθμιστεί. Εμφανίζονται δείγματα δεδομένων.",
    sample_data_unreachable: "Δεν ήταν δυνατή η σύνδεση με τη βάση δεδομένων. Εμφανίζονται δείγματα δεδομένων.",
};

pub fn labels(language: Language) -> &'static Labels {
    match language {
        Language::En => &EN,
        Language::Gr => &GR,
    }
}

/// A banner shown above the results when the data is not live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Notice {
    SampleDataUnconfigured,
    SampleDataUnreachable,
}

impl Notice {
    pub fn message(self, language: Language) -> &'static str {
        let labels = labels(language);
        match self {
            Notice::SampleDataUnconfigured => labels.sample_data_unconfigured,
            Notice::SampleDataUnreachable => labels.sample_data_unreachable,
        }
    }
}

static CATEGORIES: OnceLock<Vec<Category>> = OnceLock::new();

/// The fixed category catalogue.
pub fn categories() -> &'static [Category] {
    CATEGORIES.get_or_init(|| {
        [
            ("1", "Wellness & Beauty", "Ευεξία & Ομορφιά", "Wellness"),
            ("2", "Workshops & Classes", "Εργαστήρια & Μαθήματα", "Workshop"),
            ("3", "Cultural Experiences", "Πολιτιστικές Εμπειρίες", "Culture"),
            ("4", "Outdoor Adventures", "Υπαίθριες Περιπέτειες", "Adventure"),
        ]
        .into_iter()
        .map(|(id, name_en, name_gr, icon)| Category {
            id: id.to_string(),
            name_en: name_en.to_string(),
            name_gr: name_gr.to_string(),
            icon: icon.to_string(),
        })
        .collect()
    })
}

pub fn category(id: &str) -> Option<&'static Category> {
    categories().iter().find(|c| c.id == id)
}
