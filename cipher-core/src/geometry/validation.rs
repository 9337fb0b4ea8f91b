//! Consistency checks between the interface definitions, the interface map and the
//! phase adjacency.

use crate::errors::{CipherError, CipherResult, PhasePair};
use crate::interface::InterfaceDefinition;
use std::collections::{BTreeMap, BTreeSet, HashSet};

use super::{CipherGeometry, NO_INTERFACE};

impl CipherGeometry {
    /// Run all consistency checks.
    pub fn validate(&self) -> CipherResult<()> {
        self.check_interface_phase_pairs()?;
        self.validate_interfaces()?;
        self.validate_interface_map()
    }

    /// Check every interface phase pair refers to two distinct existing phases and that
    /// no pair is claimed more than once.
    pub fn check_interface_phase_pairs(&self) -> CipherResult<()> {
        let num_phases = self.num_phases();
        let mut owners: BTreeMap<PhasePair, usize> = BTreeMap::new();
        for (idx, interface) in self.interfaces.iter().enumerate() {
            for &pair in interface.pairs() {
                if pair[1] >= num_phases || pair[0] == pair[1] {
                    return Err(CipherError::InvalidPhasePair {
                        interface: interface.name(),
                        pair,
                        num_phases,
                    });
                }
                if let Some(&first) = owners.get(&pair) {
                    return Err(CipherError::DuplicateInterfacePhasePair {
                        pair,
                        first: self.interfaces[first].name(),
                        second: interface.name(),
                    });
                }
                owners.insert(pair, idx);
            }
        }
        Ok(())
    }

    /// Check interface names are unique and every phase pair lies between the phase
    /// types its interface applies to.
    pub fn validate_interfaces(&self) -> CipherResult<()> {
        let mut names = HashSet::new();
        for interface in &self.interfaces {
            let name = interface.name();
            if !names.insert(name.clone()) {
                return Err(CipherError::DuplicateInterfaceName { name });
            }

            let [ends_a, ends_b] = self.resolve_phase_types(interface)?;
            for &pair in interface.pairs() {
                let (Some(&type_a), Some(&type_b)) = (
                    self.phase_phase_type.get(pair[0]),
                    self.phase_phase_type.get(pair[1]),
                ) else {
                    return Err(CipherError::InvalidPhasePair {
                        interface: name,
                        pair,
                        num_phases: self.num_phases(),
                    });
                };
                let matches = (ends_a.contains(&type_a) && ends_b.contains(&type_b))
                    || (ends_a.contains(&type_b) && ends_b.contains(&type_a));
                if !matches {
                    return Err(CipherError::InterfacePhaseTypeMismatch {
                        interface: name,
                        pair,
                    });
                }
            }
        }
        Ok(())
    }

    /// Check the interface map agrees with the interface definitions and covers every
    /// adjacent phase pair.
    pub fn validate_interface_map(&self) -> CipherResult<()> {
        for ((a, b), &value) in self.interface_map.indexed_iter() {
            if value == NO_INTERFACE {
                continue;
            }
            let pair = [a, b];
            let consistent = a < b
                && usize::try_from(value)
                    .ok()
                    .and_then(|idx| self.interfaces.get(idx))
                    .is_some_and(|interface| interface.pairs().binary_search(&pair).is_ok());
            if !consistent {
                return Err(CipherError::InterfaceMapMismatch { pair, index: value });
            }
        }

        for (idx, interface) in self.interfaces.iter().enumerate() {
            for &pair in interface.pairs() {
                let value = self
                    .interface_map
                    .get(pair)
                    .copied()
                    .unwrap_or(NO_INTERFACE);
                if value != idx as i64 {
                    return Err(CipherError::InterfaceMapMismatch { pair, index: value });
                }
            }
        }

        let missing: Vec<PhasePair> = self
            .adjacent_phase_pairs()
            .into_iter()
            .filter(|&pair| self.interface_map[pair] == NO_INTERFACE)
            .collect();
        if !missing.is_empty() {
            return Err(CipherError::MissingInterfaces { pairs: missing });
        }
        Ok(())
    }

    /// Flat phase type indices at either side of an interface.
    ///
    /// Each side names either a phase type or a material, the latter standing for all
    /// of the material's phase types.
    pub(crate) fn resolve_phase_types(
        &self,
        interface: &InterfaceDefinition,
    ) -> CipherResult<[BTreeSet<usize>; 2]> {
        let resolve = |name: &String| -> CipherResult<BTreeSet<usize>> {
            let ids = self.phase_type_ids(name);
            if ids.is_empty() {
                return Err(CipherError::UnknownPhaseType {
                    interface: interface.name(),
                    name: name.clone(),
                });
            }
            Ok(ids)
        };
        let [a, b] = interface.phase_types();
        Ok([resolve(a)?, resolve(b)?])
    }

    fn phase_type_ids(&self, name: &str) -> BTreeSet<usize> {
        self.phase_types()
            .into_iter()
            .enumerate()
            .filter(|(_, (mat_idx, pt))| {
                let material_name = &self.materials[*mat_idx].name;
                material_name == name || pt.name(material_name) == name
            })
            .map(|(type_idx, _)| type_idx)
            .collect()
    }
}
