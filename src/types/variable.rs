//! Static variable tables describing what each weather provider measures and
//! how its native fields map onto the canonical short names (acronyms).

/// One provider-native weather variable.
///
/// `code` is whatever the provider uses to identify the variable (a JSON field
/// name for AEMET, a numeric id for Meteocat). `acronym` is the canonical short
/// name used everywhere past the normalizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VariableDescriptor {
    pub code: &'static str,
    pub acronym: &'static str,
    pub display_name: &'static str,
    pub unit: &'static str,
    pub decimals: u8,
}

/// A pair of provider variables (`min`, `max`, both acronyms) that is collapsed
/// into a single representative value by averaging during normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MinMaxPair {
    pub acronym: &'static str,
    pub display_name: &'static str,
    pub min: &'static str,
    pub max: &'static str,
}

/// A column of the canonical schema as seen by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CanonicalVariable {
    pub acronym: &'static str,
    pub display_name: &'static str,
    pub unit: &'static str,
    pub decimals: u8,
}

/// Immutable per-provider variable table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariableTable {
    pub descriptors: &'static [VariableDescriptor],
    pub pairs: &'static [MinMaxPair],
}

impl VariableTable {
    pub fn by_code(&self, code: &str) -> Option<&'static VariableDescriptor> {
        self.descriptors.iter().find(|d| d.code == code)
    }

    pub fn by_acronym(&self, acronym: &str) -> Option<&'static VariableDescriptor> {
        self.descriptors.iter().find(|d| d.acronym == acronym)
    }

    pub(crate) fn pair_of(&self, acronym: &str) -> Option<&'static MinMaxPair> {
        self.pairs
            .iter()
            .find(|p| p.min == acronym || p.max == acronym)
    }

    /// The columns a normalized row of this provider can carry, in table order.
    ///
    /// Members of a min/max pair are replaced by the pair's averaged variable,
    /// placed where the first member appears.
    pub fn canonical_variables(&self) -> Vec<CanonicalVariable> {
        let mut out: Vec<CanonicalVariable> = Vec::with_capacity(self.descriptors.len());
        for descriptor in self.descriptors {
            match self.pair_of(descriptor.acronym) {
                Some(pair) => {
                    if out.iter().any(|v| v.acronym == pair.acronym) {
                        continue;
                    }
                    out.push(CanonicalVariable {
                        acronym: pair.acronym,
                        display_name: pair.display_name,
                        unit: descriptor.unit,
                        decimals: descriptor.decimals,
                    });
                }
                None => out.push(CanonicalVariable {
                    acronym: descriptor.acronym,
                    display_name: descriptor.display_name,
                    unit: descriptor.unit,
                    decimals: descriptor.decimals,
                }),
            }
        }
        out
    }

    /// Acronyms of [`Self::canonical_variables`], i.e. the persisted value columns.
    pub fn canonical_acronyms(&self) -> Vec<String> {
        self.canonical_variables()
            .into_iter()
            .map(|v| v.acronym.to_string())
            .collect()
    }

    /// Decimals used when rounding a canonical variable.
    pub fn decimals_for(&self, acronym: &str) -> Option<u8> {
        self.canonical_variables()
            .into_iter()
            .find(|v| v.acronym == acronym)
            .map(|v| v.decimals)
    }
}

pub static AEMET_VARIABLES: VariableTable = VariableTable {
    descriptors: &[
        VariableDescriptor {
            code: "tmin",
            acronym: "Tmin",
            display_name: "Minimum temperature",
            unit: "ºC",
            decimals: 1,
        },
        VariableDescriptor {
            code: "tmax",
            acronym: "Tmax",
            display_name: "Maximum temperature",
            unit: "ºC",
            decimals: 1,
        },
        VariableDescriptor {
            code: "prec",
            acronym: "pp",
            display_name: "Precipitation",
            unit: "mm",
            decimals: 1,
        },
        VariableDescriptor {
            code: "presMin",
            acronym: "pmin",
            display_name: "Minimum pressure",
            unit: "hPa",
            decimals: 1,
        },
        VariableDescriptor {
            code: "presMax",
            acronym: "pmax",
            display_name: "Maximum pressure",
            unit: "hPa",
            decimals: 1,
        },
        VariableDescriptor {
            code: "hrMedia",
            acronym: "RH",
            display_name: "Relative humidity",
            unit: "%",
            decimals: 0,
        },
        VariableDescriptor {
            code: "velmedia",
            acronym: "ws",
            display_name: "Wind speed",
            unit: "m/s",
            decimals: 1,
        },
    ],
    pairs: &[
        MinMaxPair {
            acronym: "T",
            display_name: "Temperature",
            min: "Tmin",
            max: "Tmax",
        },
        MinMaxPair {
            acronym: "p",
            display_name: "Air pressure",
            min: "pmin",
            max: "pmax",
        },
    ],
};

pub static METEOCAT_VARIABLES: VariableTable = VariableTable {
    descriptors: &[
        VariableDescriptor {
            code: "32",
            acronym: "T",
            display_name: "Temperature",
            unit: "ºC",
            decimals: 1,
        },
        VariableDescriptor {
            code: "33",
            acronym: "RH",
            display_name: "Relative humidity",
            unit: "%",
            decimals: 0,
        },
        VariableDescriptor {
            code: "34",
            acronym: "p",
            display_name: "Air pressure",
            unit: "hPa",
            decimals: 1,
        },
        VariableDescriptor {
            code: "35",
            acronym: "pp",
            display_name: "Precipitation",
            unit: "mm",
            decimals: 1,
        },
    ],
    pairs: &[],
};

/// Rounds `value` to `decimals` places.
pub(crate) fn round_to(value: f64, decimals: u8) -> f64 {
    let factor = 10f64.powi(i32::from(decimals));
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aemet_pairs_collapse_into_single_columns() {
        let acronyms = AEMET_VARIABLES.canonical_acronyms();
        assert_eq!(acronyms, vec!["T", "pp", "p", "RH", "ws"]);
    }

    #[test]
    fn meteocat_columns_follow_descriptor_order() {
        assert_eq!(
            METEOCAT_VARIABLES.canonical_acronyms(),
            vec!["T", "RH", "p", "pp"]
        );
        assert_eq!(METEOCAT_VARIABLES.by_code("33").map(|d| d.acronym), Some("RH"));
        assert!(METEOCAT_VARIABLES.by_code("99").is_none());
    }

    #[test]
    fn decimals_of_pair_come_from_member() {
        assert_eq!(AEMET_VARIABLES.decimals_for("T"), Some(1));
        assert_eq!(AEMET_VARIABLES.decimals_for("RH"), Some(0));
        assert_eq!(AEMET_VARIABLES.decimals_for("Tmin"), None);
    }

    #[test]
    fn rounding() {
        assert_eq!(round_to(9.96666, 1), 10.0);
        assert_eq!(round_to(71.5, 0), 72.0);
        assert_eq!(round_to(1013.25, 1), 1013.3);
    }
}
