//! The fixed daily slot grid, per-site tracks and per-track service catalogues.

use crate::backend::{StoreError, StoreResult};
use crate::models::{ServiceDescriptor, Slot, Track};

/// Times of day, in display order. The gap between 13:00 and 15:00 is lunch.
pub const TIME_SLOTS: [&str; 15] = [
    "08:30", "09:00", "09:30", "10:00", "10:30", "11:00", "11:30", "12:00", "12:30", "13:00",
    "15:00", "15:30", "16:00", "16:30", "17:00",
];

/// Occupants allowed per (date, slot).
pub const DEFAULT_SLOT_CAPACITY: usize = 2;

/// Site that runs the PICC track only.
pub const PICC_ONLY_SITE: &str = "villa_ginestre";

pub const PICC_SERVICES: [ServiceDescriptor; 2] = [
    ServiceDescriptor {
        id: "medicazione_semplice",
        label: "Medicazione semplice",
    },
    ServiceDescriptor {
        id: "irrigazione_catetere",
        label: "Irrigazione catetere",
    },
];

pub const MED_SERVICES: [ServiceDescriptor; 4] = [
    ServiceDescriptor {
        id: "medicazione_semplice",
        label: "Medicazione semplice",
    },
    ServiceDescriptor {
        id: "fasciatura_semplice",
        label: "Fasciatura semplice",
    },
    ServiceDescriptor {
        id: "iniezione_terapeutica",
        label: "Iniezione terapeutica",
    },
    ServiceDescriptor {
        id: "catetere_vescicale",
        label: "Catetere vescicale",
    },
];

/// Services bookable on a track. The same on every site.
pub fn catalogue_for(track: Track) -> &'static [ServiceDescriptor] {
    match track {
        Track::Picc => &PICC_SERVICES,
        Track::Med => &MED_SERVICES,
    }
}

/// Which tracks a clinic site exposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteConfig {
    pub ambulatorio: String,
    pub tracks: Vec<Track>,
}

impl SiteConfig {
    pub fn for_ambulatorio(ambulatorio: &str) -> Self {
        let tracks = if ambulatorio == PICC_ONLY_SITE {
            vec![Track::Picc]
        } else {
            Track::ALL.to_vec()
        };
        Self {
            ambulatorio: ambulatorio.to_string(),
            tracks,
        }
    }
}

/// Slot catalogue and capacity rule for one site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotGrid {
    site: SiteConfig,
    capacity: usize,
}

impl SlotGrid {
    pub fn new(site: SiteConfig, capacity: usize) -> Self {
        Self { site, capacity }
    }

    pub fn for_site(ambulatorio: &str, capacity: usize) -> Self {
        Self::new(SiteConfig::for_ambulatorio(ambulatorio), capacity)
    }

    pub fn ambulatorio(&self) -> &str {
        &self.site.ambulatorio
    }

    pub fn tracks(&self) -> &[Track] {
        &self.site.tracks
    }

    pub fn has_track(&self, track: Track) -> bool {
        self.site.tracks.contains(&track)
    }

    /// Times of day bookable on `track`; empty when the site lacks the track.
    pub fn slots_for_track(&self, track: Track) -> &'static [&'static str] {
        if self.has_track(track) {
            &TIME_SLOTS
        } else {
            &[]
        }
    }

    /// Every slot of the grid, time-major.
    pub fn slots(&self) -> Vec<Slot> {
        TIME_SLOTS
            .iter()
            .flat_map(|time| {
                self.site
                    .tracks
                    .iter()
                    .map(move |track| Slot::new(*time, *track))
            })
            .collect()
    }

    pub fn capacity_of(&self, _slot: &Slot) -> usize {
        self.capacity
    }

    pub fn services_catalogue_for(&self, track: Track) -> &'static [ServiceDescriptor] {
        catalogue_for(track)
    }

    pub fn is_valid_slot(&self, slot: &Slot) -> bool {
        self.slots_for_track(slot.track).contains(&slot.time.as_str())
    }

    pub fn check_slot(&self, slot: &Slot) -> StoreResult<()> {
        if self.is_valid_slot(slot) {
            Ok(())
        } else {
            Err(StoreError::Validation(format!(
                "Slot {} is not offered at {}",
                slot,
                self.site.ambulatorio
            )))
        }
    }

    /// Services must be non-empty, distinct, and from the track's catalogue.
    pub fn validate_services(&self, track: Track, services: &[String]) -> StoreResult<()> {
        if services.is_empty() {
            return Err(StoreError::Validation(
                "Select at least one service".to_string(),
            ));
        }
        let catalogue = self.services_catalogue_for(track);
        for (i, service) in services.iter().enumerate() {
            if !catalogue.iter().any(|d| d.id == service.as_str()) {
                return Err(StoreError::Validation(format!(
                    "Service {} is not offered on the {} track",
                    service, track
                )));
            }
            if services[..i].contains(service) {
                return Err(StoreError::Validation(format!(
                    "Service {} selected twice",
                    service
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_picc_only_site() {
        let grid = SlotGrid::for_site("villa_ginestre", 2);
        assert_eq!(grid.tracks(), &[Track::Picc]);
        assert!(grid.slots_for_track(Track::Med).is_empty());
        assert_eq!(grid.slots().len(), 15);
    }

    #[test]
    fn test_two_track_site() {
        let grid = SlotGrid::for_site("pta_centro", 2);
        assert_eq!(grid.tracks(), &[Track::Picc, Track::Med]);
        assert_eq!(grid.slots().len(), 30);
        assert_eq!(grid.slots()[1], Slot::new("08:30", Track::Med));
    }

    #[test]
    fn test_lunch_gap() {
        let grid = SlotGrid::for_site("pta_centro", 2);
        assert!(grid.is_valid_slot(&Slot::new("13:00", Track::Med)));
        assert!(!grid.is_valid_slot(&Slot::new("13:30", Track::Med)));
        assert!(!grid.is_valid_slot(&Slot::new("14:00", Track::Picc)));
        assert!(grid.is_valid_slot(&Slot::new("15:00", Track::Picc)));
    }

    #[test]
    fn test_capacity_is_configurable() {
        let slot = Slot::new("09:00", Track::Picc);
        assert_eq!(SlotGrid::for_site("pta_centro", 2).capacity_of(&slot), 2);
        assert_eq!(SlotGrid::for_site("pta_centro", 3).capacity_of(&slot), 3);
    }

    #[test]
    fn test_service_catalogues() {
        let grid = SlotGrid::for_site("pta_centro", 2);
        assert_eq!(grid.services_catalogue_for(Track::Picc).len(), 2);
        assert_eq!(grid.services_catalogue_for(Track::Med).len(), 4);
    }

    #[test]
    fn test_validate_services() {
        let grid = SlotGrid::for_site("pta_centro", 2);
        assert!(grid
            .validate_services(Track::Picc, &["irrigazione_catetere".into()])
            .is_ok());
        assert!(matches!(
            grid.validate_services(Track::Picc, &[]),
            Err(StoreError::Validation(_))
        ));
        assert!(matches!(
            grid.validate_services(Track::Picc, &["catetere_vescicale".into()]),
            Err(StoreError::Validation(_))
        ));
        assert!(matches!(
            grid.validate_services(
                Track::Med,
                &["fasciatura_semplice".into(), "fasciatura_semplice".into()]
            ),
            Err(StoreError::Validation(_))
        ));
    }
}
