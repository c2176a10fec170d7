// Built-in listings shown when the backend is not configured or unreachable.

use crate::core_modules::listing::{Contact, Listing};

fn contact(phone: &str, email: &str) -> Contact {
    Contact {
        phone: phone.to_string(),
        whatsapp: phone.trim_start_matches('+').to_string(),
        email: email.to_string(),
        ..Contact::default()
    }
}

pub fn sample_listings() -> Vec<Listing> {
    vec![
        Listing::new(1, "1", 37.9755, 23.7348)
            .with_titles("Hammam Baths Athens", "Χαμάμ Αθηνών")
            .with_descriptions(
                "Traditional steam baths a few steps from the Acropolis.",
                "Παραδοσιακά λουτρά ατμού λίγα βήματα από την Ακρόπολη.",
            )
            .with_contact(contact("+302103212020", "info@hammam-athens.gr")),
        Listing::new(2, "2", 37.9780, 23.7218)
            .with_titles("Psirri Pottery Workshop", "Εργαστήρι Κεραμικής Ψυρρή")
            .with_descriptions(
                "Shape and glaze your own bowl on the wheel in two hours.",
                "Φτιάξτε και υαλώστε το δικό σας μπολ στον τροχό σε δύο ώρες.",
            )
            .with_contact(contact("+302103250011", "hello@psirripottery.gr")),
        Listing::new(3, "3", 40.6325, 22.9471)
            .with_titles("Ano Poli Walking Tour", "Περιήγηση στην Άνω Πόλη")
            .with_descriptions(
                "Byzantine walls and Ottoman houses of Thessaloniki's old town.",
                "Βυζαντινά τείχη και οθωμανικά σπίτια της παλιάς Θεσσαλονίκης.",
            )
            .with_contact(contact("+302310220220", "tours@anopoli.gr")),
        Listing::new(4, "4", 35.2401, 23.9594)
            .with_titles("Samaria Gorge Trek", "Πεζοπορία στο Φαράγγι της Σαμαριάς")
            .with_descriptions(
                "Guided 16 km descent through the White Mountains to the Libyan Sea.",
                "Ξενάγηση 16 χλμ. μέσα από τα Λευκά Όρη ως το Λιβυκό Πέλαγος.",
            )
            .with_contact(contact("+302821045678", "trek@samaria.gr")),
        Listing::new(5, "2", 35.3397, 25.1335)
            .with_titles("Cretan Cooking Class", "Μάθημα Κρητικής Κουζίνας")
            .with_descriptions(
                "Cook dakos and kalitsounia with a Heraklion family.",
                "Μαγειρέψτε ντάκο και καλιτσούνια με μια οικογένεια του Ηρακλείου.",
            )
            .with_contact(contact("+302810301234", "cook@cretankitchen.gr")),
        Listing::new(6, "3", 37.5673, 22.8015)
            .with_titles("Nafplio Wine Evening", "Οινική Βραδιά στο Ναύπλιο")
            .with_descriptions(
                "Nemea wines tasted under the Palamidi fortress.",
                "Κρασιά της Νεμέας κάτω από το κάστρο του Παλαμηδίου.",
            )
            .with_contact(contact("+302752029876", "wine@nafplio.gr")),
        Listing::new(7, "1", 36.4167, 25.4321)
            .with_titles("Santorini Sunset Yoga", "Γιόγκα στο Ηλιοβασίλεμα της Σαντορίνης")
            .with_descriptions(
                "Evening vinyasa on a caldera terrace in Fira.",
                "Βραδινό vinyasa σε βεράντα με θέα την καλντέρα στα Φηρά.",
            )
            .with_contact(contact("+302286022110", "namaste@santoyoga.gr")),
        Listing::new(8, "4", 39.6650, 20.8537)
            .with_titles("Lake Pamvotis Kayak", "Καγιάκ στη Λίμνη Παμβώτιδα")
            .with_descriptions(
                "Paddle around the island of Ioannina's lake at sunrise.",
                "Κουπί γύρω από το νησάκι της λίμνης των Ιωαννίνων με την ανατολή.",
            )
            .with_contact(contact("+302651078900", "kayak@pamvotis.gr")),
    ]
    .into_iter()
    .map(Listing::with_placeholder_image)
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::normalizer::BoundingBox;
    use crate::core_modules::translations::category;

    #[test]
    fn sample_listings_are_well_formed() {
        let bounds = BoundingBox::greece();
        for listing in sample_listings() {
            assert!(listing.approved);
            assert!(listing.has_valid_coords());
            assert!(bounds.contains(listing.coords()), "listing {} is outside Greece", listing.id);
            assert!(category(&listing.category_id).is_some());
            assert_eq!(listing.images.len(), 1);
        }
    }
}
