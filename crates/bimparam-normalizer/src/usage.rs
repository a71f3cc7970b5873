// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Space usage per storey, read from element names
//!
//! Names carry the designer's intent ("Chambre 12 - Lit soin",
//! "Cloison CL-2"), so usage is a keyword match on the lowercased name,
//! falling back to the type tag. Tables are scanned in order and the first
//! hit wins. Furnishings, fixtures, proxies and railings do not shape a
//! space and are counted apart.

use bimparam_model::NormalizedElement;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Space usage of an element
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageCategory {
    Bedroom,
    Bathroom,
    Kitchen,
    Living,
    Foyer,
    Office,
    Corridor,
    Storage,
    Partition,
    Furnishing,
    Ceiling,
    Floor,
    Door,
    /// Nothing in the name points to a use
    General,
}

/// Finer usage detail
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageDetail {
    CareBed,
    Ceiling,
    Partition,
    Door,
    Window,
    Floor,
    Stair,
    Elevator,
    Ramp,
    Sanitary,
    Shower,
    Sink,
    Kitchen,
    Bedroom,
    Living,
    Corridor,
    Foyer,
    Office,
    Storage,
    Furnishing,
    Lighting,
    Appliance,
    Railing,
    Proxy,
    Generic,
    General,
}

const FURNISHING: &[&str] = &["mobilier", "furniture", "chair", "table", "desk", "cabinet", "shelf"];
const CEILING: &[&str] = &["plafond", "ceiling", "composé", "plaf"];
const PARTITION: &[&str] = &["mur", "wall", "clois", "partition"];
const FLOOR: &[&str] = &["plancher", "floor", "sol"];
const DOOR: &[&str] = &["porte", "door"];

const CATEGORIES: &[(UsageCategory, &[&str])] = &[
    (UsageCategory::Bedroom, &["chambre", "bedroom", "room"]),
    (
        UsageCategory::Bathroom,
        &["bain", "bath", "douche", "shower", "toilette", "toilet", "wc"],
    ),
    (UsageCategory::Kitchen, &["cuisine", "kitchen"]),
    (UsageCategory::Living, &["salon", "living", "séjour"]),
    (UsageCategory::Foyer, &["foyer", "entrée", "entrance", "hall"]),
    (UsageCategory::Office, &["bureau", "office", "étude"]),
    (UsageCategory::Corridor, &["corridor", "couloir", "passage", "hallway"]),
    (UsageCategory::Storage, &["rangement", "storage", "closet"]),
    (UsageCategory::Partition, PARTITION),
    (UsageCategory::Furnishing, FURNISHING),
    (UsageCategory::Ceiling, CEILING),
    (UsageCategory::Floor, FLOOR),
    (UsageCategory::Door, DOOR),
];

const DETAILS: &[(UsageDetail, &[&str])] = &[
    (UsageDetail::CareBed, &["lit", "bed", "soin"]),
    (UsageDetail::Ceiling, CEILING),
    (UsageDetail::Partition, PARTITION),
    (UsageDetail::Door, DOOR),
    (UsageDetail::Window, &["fenêtre", "window"]),
    (UsageDetail::Floor, FLOOR),
    (UsageDetail::Stair, &["escalier", "stair"]),
    (UsageDetail::Elevator, &["ascenseur", "elevator"]),
    (UsageDetail::Ramp, &["rampe", "ramp"]),
    (UsageDetail::Sanitary, &["toilette", "wc", "bathroom"]),
    (UsageDetail::Shower, &["douche", "shower"]),
    (UsageDetail::Sink, &["lavabo", "sink"]),
    (UsageDetail::Kitchen, &["cuisine", "kitchen"]),
    (UsageDetail::Bedroom, &["chambre", "bedroom"]),
    (UsageDetail::Living, &["salon", "living"]),
    (UsageDetail::Corridor, &["corridor", "couloir"]),
    (UsageDetail::Foyer, &["foyer", "entrée"]),
    (UsageDetail::Office, &["bureau", "office"]),
    (UsageDetail::Storage, &["rangement", "storage"]),
    (UsageDetail::Furnishing, FURNISHING),
    (UsageDetail::Lighting, &["lamp", "light", "fixture", "luminaire"]),
    (UsageDetail::Appliance, &["appliance", "appareil", "machine"]),
    (
        UsageDetail::Railing,
        &["garde-corps", "mainscourante", "railing", "handrail"],
    ),
    (UsageDetail::Proxy, &["proxy", "elementproxy", "buildingelementproxy"]),
    (UsageDetail::Generic, &["generic", "undefined", "unknown", "misc"]),
];

const NON_SPATIAL: &[&str] = &[
    "mobilier",
    "mobili",
    "furniture",
    "chair",
    "table",
    "desk",
    "bed",
    "cabinet",
    "shelf",
    "lamp",
    "light",
    "fixture",
    "appliance",
    "proxy",
    "elementproxy",
    "buildingelementproxy",
    "garde-corps",
    "mainscourante",
    "railing",
    "handrail",
];

fn first_match<T: Copy>(name: &str, table: &[(T, &[&str])]) -> Option<T> {
    table
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| name.contains(k)))
        .map(|(value, _)| *value)
}

/// Usage and detail of a name
pub fn classify_usage(name: &str) -> (UsageCategory, UsageDetail) {
    let name = name.to_lowercase();
    (
        first_match(&name, CATEGORIES).unwrap_or(UsageCategory::General),
        first_match(&name, DETAILS).unwrap_or(UsageDetail::General),
    )
}

/// Check if a name describes something that shapes a space
///
/// Furniture, fixtures, appliances, proxies and railings do not.
pub fn is_spatial(name: &str) -> bool {
    let name = name.to_lowercase();
    !NON_SPATIAL.iter().any(|k| name.contains(k))
}

/// Usage counts of one storey
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreyUsage {
    /// Elements that shape a space
    pub spatial: usize,
    /// Furnishings, fixtures and the like
    pub excluded: usize,
    /// Spatial elements per usage
    pub categories: BTreeMap<UsageCategory, usize>,
    /// Spatial elements per usage and detail
    pub details: BTreeMap<UsageCategory, BTreeMap<UsageDetail, usize>>,
}

impl StoreyUsage {
    fn record(&mut self, name: &str) {
        if !is_spatial(name) {
            self.excluded += 1;
            return;
        }
        let (category, detail) = classify_usage(name);
        self.spatial += 1;
        *self.categories.entry(category).or_default() += 1;
        *self
            .details
            .entry(category)
            .or_default()
            .entry(detail)
            .or_default() += 1;
    }

    /// Spatial elements of one usage
    pub fn count(&self, category: UsageCategory) -> usize {
        self.categories.get(&category).copied().unwrap_or(0)
    }

    /// Usage with the most elements; ties go to the first in declaration order
    pub fn dominant(&self) -> Option<UsageCategory> {
        self.categories
            .iter()
            .filter(|(category, _)| **category != UsageCategory::General)
            .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
            .map(|(category, _)| *category)
    }
}

/// Usage counts of a set of normalized elements, per storey
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageSummary {
    pub storeys: BTreeMap<String, StoreyUsage>,
    /// Elements with no storey
    pub unplaced: StoreyUsage,
}

impl UsageSummary {
    /// Count usages; elements without a name are read by type tag
    pub fn of(elements: &[NormalizedElement]) -> Self {
        let mut summary = Self::default();
        for element in elements {
            let name = element.name.as_deref().unwrap_or(&element.type_tag);
            let usage = match &element.storey {
                Some(storey) => summary.storeys.entry(storey.clone()).or_default(),
                None => &mut summary.unplaced,
            };
            usage.record(name);
        }
        log::debug!(
            "Usage summary: {} storeys, {} unplaced elements",
            summary.storeys.len(),
            summary.unplaced.spatial + summary.unplaced.excluded
        );
        summary
    }

    /// Counts of one storey
    pub fn storey(&self, name: &str) -> Option<&StoreyUsage> {
        self.storeys.get(name)
    }

    /// Spatial elements of one usage over all storeys
    pub fn total(&self, category: UsageCategory) -> usize {
        self.storeys
            .values()
            .chain(std::iter::once(&self.unplaced))
            .map(|usage| usage.count(category))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Normalizer;
    use bimparam_model::{RawElement, VecSource};

    #[test]
    fn test_classify_usage() {
        assert_eq!(
            classify_usage("Chambre 12 - Lit soin"),
            (UsageCategory::Bedroom, UsageDetail::CareBed)
        );
        assert_eq!(
            classify_usage("Salle de bain WC"),
            (UsageCategory::Bathroom, UsageDetail::Sanitary)
        );
        assert_eq!(
            classify_usage("Cloison CL-2"),
            (UsageCategory::Partition, UsageDetail::Partition)
        );
        assert_eq!(
            classify_usage("HALL D'ENTRÉE"),
            (UsageCategory::Foyer, UsageDetail::Foyer)
        );
        assert_eq!(
            classify_usage("Porte 900"),
            (UsageCategory::Door, UsageDetail::Door)
        );
        assert_eq!(
            classify_usage("Escalier A"),
            (UsageCategory::General, UsageDetail::Stair)
        );
        assert_eq!(
            classify_usage("IfcColumn"),
            (UsageCategory::General, UsageDetail::General)
        );
    }

    #[test]
    fn test_is_spatial() {
        assert!(is_spatial("Mur extérieur"));
        assert!(is_spatial("Plancher N5"));
        assert!(!is_spatial("Chaise - Furniture"));
        assert!(!is_spatial("Luminaire LIGHT-2"));
        assert!(!is_spatial("IfcBuildingElementProxy"));
        assert!(!is_spatial("Garde-corps vitré"));
    }

    #[test]
    fn test_summary_per_storey() {
        let source = VecSource::new(vec![
            RawElement::new("W1", "IfcWall")
                .with_name("Cloison chambre")
                .with_storey("NIVEAU 5"),
            RawElement::new("W2", "IfcWall")
                .with_name("Mur corridor")
                .with_storey("NIVEAU 5"),
            RawElement::new("W3", "IfcWall")
                .with_name("Mur couloir")
                .with_storey("NIVEAU 5"),
            RawElement::new("F1", "IfcFurnishingElement")
                .with_name("Table")
                .with_storey("NIVEAU 5"),
            RawElement::new("S1", "IfcSlab")
                .with_name("Plancher")
                .with_storey("NIVEAU 6"),
            RawElement::new("D1", "IfcDoor"),
        ]);
        let report = Normalizer::default().normalize(&source).unwrap();
        let summary = UsageSummary::of(&report.elements);

        let level5 = summary.storey("NIVEAU 5").unwrap();
        assert_eq!(level5.spatial, 3);
        assert_eq!(level5.excluded, 1);
        assert_eq!(level5.count(UsageCategory::Bedroom), 1);
        assert_eq!(level5.count(UsageCategory::Corridor), 2);
        assert_eq!(level5.dominant(), Some(UsageCategory::Corridor));
        assert_eq!(
            level5.details[&UsageCategory::Bedroom][&UsageDetail::Partition],
            1
        );

        let level6 = summary.storey("NIVEAU 6").unwrap();
        assert_eq!(level6.count(UsageCategory::Floor), 1);

        // unnamed, so read by type tag
        assert_eq!(summary.unplaced.count(UsageCategory::Door), 1);
        assert_eq!(summary.total(UsageCategory::Corridor), 2);
        assert!(summary.storey("NIVEAU 7").is_none());
    }

    #[test]
    fn test_summary_json_keys() {
        let mut usage = StoreyUsage::default();
        usage.record("Cuisine");
        let json = serde_json::to_string(&usage).unwrap();
        assert!(json.contains(r#""categories":{"kitchen":1}"#));
        let back: StoreyUsage = serde_json::from_str(&json).unwrap();
        assert_eq!(back, usage);
    }
}
