//! Grouping of missing records and year-range compaction.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::reconcile::{MissingReason, MissingVehicle};
use crate::vehicle::{BodyType, Fuel, VehicleType};

/// A maximal run of consecutive years, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct YearRange {
    pub start: i32,
    pub end: i32,
}

impl YearRange {
    /// Years covered, in ascending order.
    pub fn years(self) -> impl Iterator<Item = i32> {
        self.start..=self.end
    }
}

/// Compact years into maximal contiguous ranges.
///
/// Input may be unsorted and contain duplicates. The ranges are sorted,
/// disjoint and cover exactly the distinct input years.
#[must_use]
pub fn find_year_ranges(years: &[i32]) -> Vec<YearRange> {
    let mut sorted = years.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    let mut ranges = Vec::new();
    let mut iter = sorted.into_iter();
    let Some(first) = iter.next() else {
        return ranges;
    };
    let mut current = YearRange { start: first, end: first };
    for year in iter {
        if year == current.end + 1 {
            current.end = year;
        } else {
            ranges.push(current);
            current = YearRange { start: year, end: year };
        }
    }
    ranges.push(current);
    ranges
}

/// Missing records of one (brand, base model), with every variant seen.
///
/// Sets are ordered, so the first element of each is a stable
/// representative when only one value can be emitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingVehicleGroup {
    pub brand: String,
    pub model: String,
    pub years: BTreeSet<i32>,
    pub vehicle_types: BTreeSet<VehicleType>,
    pub trims: BTreeSet<String>,
    pub engine_names: BTreeSet<String>,
    pub fuels: BTreeSet<Fuel>,
    pub body_types: BTreeSet<BodyType>,
    pub full_model_names: BTreeSet<String>,
    pub reasons: BTreeSet<MissingReason>,
}

impl MissingVehicleGroup {
    fn new(brand: &str, model: &str) -> Self {
        Self {
            brand: brand.to_string(),
            model: model.to_string(),
            ..Self::default()
        }
    }

    fn add(&mut self, missing: &MissingVehicle) {
        let record = &missing.record;
        self.years.insert(record.year);
        self.vehicle_types.insert(record.vehicle_type);
        if let Some(trim) = &record.trim {
            self.trims.insert(trim.clone());
        }
        if let Some(engine) = &record.engine_name {
            self.engine_names.insert(engine.clone());
        }
        self.fuels.insert(record.fuel);
        self.body_types.insert(record.body_type);
        self.full_model_names.insert(record.full_model_name.clone());
        self.reasons.insert(missing.reason);
    }

    #[must_use]
    pub fn year_ranges(&self) -> Vec<YearRange> {
        let years: Vec<i32> = self.years.iter().copied().collect();
        find_year_ranges(&years)
    }

    #[must_use]
    pub fn trim(&self) -> Option<&str> {
        self.trims.first().map(String::as_str)
    }

    #[must_use]
    pub fn engine_name(&self) -> Option<&str> {
        self.engine_names.first().map(String::as_str)
    }

    /// Representative fuel, skipping `unknown` when anything else was seen.
    #[must_use]
    pub fn fuel(&self) -> Fuel {
        self.fuels
            .iter()
            .copied()
            .find(|f| *f != Fuel::Unknown)
            .unwrap_or(Fuel::Unknown)
    }

    #[must_use]
    pub fn body_type(&self) -> Option<BodyType> {
        self.body_types.first().copied()
    }

    #[must_use]
    pub fn vehicle_type(&self) -> Option<VehicleType> {
        self.vehicle_types.first().copied()
    }
}

/// Missing groups keyed by brand, then base model.
pub type GroupedMissing = BTreeMap<String, BTreeMap<String, MissingVehicleGroup>>;

/// Group missing records by brand and base model.
#[must_use]
pub fn compact(missing: &[MissingVehicle]) -> GroupedMissing {
    let mut grouped = GroupedMissing::new();
    for item in missing {
        let record = &item.record;
        grouped
            .entry(record.brand.clone())
            .or_default()
            .entry(record.base_model.clone())
            .or_insert_with(|| MissingVehicleGroup::new(&record.brand, &record.base_model))
            .add(item);
    }
    grouped
}

/// Number of groups across all brands.
#[must_use]
pub fn group_count(grouped: &GroupedMissing) -> usize {
    grouped.values().map(BTreeMap::len).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize;
    use crate::vehicle::RawVehicleRecord;

    fn missing(brand: &str, model: &str, year: i32, fuel: &str) -> MissingVehicle {
        MissingVehicle {
            record: normalize(&RawVehicleRecord {
                brand: brand.to_string(),
                model: model.to_string(),
                year,
                fuel_original: fuel.to_string(),
                price: None,
                fipe_code: String::new(),
                vehicle_type: VehicleType::Car,
                reference_month: None,
            }),
            reason: MissingReason::ModelMissing,
            message: String::new(),
        }
    }

    #[test]
    fn year_ranges_example() {
        assert_eq!(
            find_year_ranges(&[2019, 2020, 2021, 2023]),
            vec![
                YearRange { start: 2019, end: 2021 },
                YearRange { start: 2023, end: 2023 }
            ]
        );
    }

    #[test]
    fn year_ranges_handle_unsorted_duplicates_and_empty() {
        assert!(find_year_ranges(&[]).is_empty());
        assert_eq!(
            find_year_ranges(&[2005, 2003, 2004, 2004, 2010, 2009]),
            vec![
                YearRange { start: 2003, end: 2005 },
                YearRange { start: 2009, end: 2010 }
            ]
        );
        assert_eq!(find_year_ranges(&[2000]), vec![YearRange { start: 2000, end: 2000 }]);
    }

    #[test]
    fn year_ranges_are_idempotent_and_cover_input_exactly() {
        let inputs: [&[i32]; 4] = [
            &[1999, 2001, 2000, 1999],
            &[2024, 2020, 2022],
            &[1995, 1996, 1997, 1998],
            &[2010, 2010, 2010],
        ];
        for input in inputs {
            let once = find_year_ranges(input);
            assert_eq!(find_year_ranges(input), once);

            let covered: Vec<i32> = once.iter().flat_map(|r| r.years()).collect();
            let expected: BTreeSet<i32> = input.iter().copied().collect();
            assert_eq!(covered, expected.into_iter().collect::<Vec<_>>());
            assert!(once.windows(2).all(|w| w[0].end + 1 < w[1].start));
        }
    }

    #[test]
    fn groups_by_brand_and_base_model() {
        let items = vec![
            missing("Honda", "Fit LX 1.5 Flex", 2015, "Flex"),
            missing("Honda", "Fit EX 1.5 Flex Aut.", 2016, "Flex"),
            missing("Honda", "Fit LX 1.5 Flex", 2015, "Flex"),
            missing("Honda", "City EX 1.5", 2019, "Gasolina"),
            missing("Fiat", "Uno Mille 1.0", 2010, ""),
        ];
        let grouped = compact(&items);

        assert_eq!(grouped.keys().collect::<Vec<_>>(), vec!["Fiat", "Honda"]);
        assert_eq!(group_count(&grouped), 3);

        let fit = &grouped["Honda"]["Fit"];
        assert_eq!(fit.years.iter().copied().collect::<Vec<_>>(), vec![2015, 2016]);
        assert_eq!(fit.trims.iter().collect::<Vec<_>>(), vec!["EX", "LX"]);
        assert_eq!(fit.trim(), Some("EX"));
        assert_eq!(fit.fuel(), Fuel::Flex);
        assert_eq!(fit.year_ranges(), vec![YearRange { start: 2015, end: 2016 }]);
        assert_eq!(fit.full_model_names.len(), 2);

        assert_eq!(grouped["Fiat"]["Uno"].fuel(), Fuel::Unknown);
    }

    #[test]
    fn compaction_is_order_independent() {
        let mut items = vec![
            missing("Honda", "Fit LX 1.5", 2015, "Flex"),
            missing("Honda", "City EX 1.5", 2019, "Gasolina"),
            missing("Honda", "Fit EX 1.5", 2017, "Flex"),
        ];
        let forward = compact(&items);
        items.reverse();
        assert_eq!(compact(&items), forward);
    }
}
