//! YAML Configuration Structures for the PBCH loopback
//!
//! Every section is optional; command line flags override file values.

use anyhow::anyhow;
use common::types::{Lmax, Pci, SubcarrierSpacing};
use nr_pbch::phy::{DmrsTypeAPosition, Mib};
use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LoopbackConfig {
    /// Cell configuration
    #[serde(default)]
    pub cell: CellConfig,
    /// MIB content of the transmitted occasion
    #[serde(default)]
    pub mib: MibConfig,
    /// Logging configuration
    #[serde(default)]
    pub log: LogConfig,
}

/// Cell configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CellConfig {
    /// Physical Cell ID
    #[serde(default = "default_pci")]
    pub pci: u16,
    /// Maximum number of SSB candidates (4, 8 or 64)
    #[serde(default = "default_l_max")]
    pub l_max: Lmax,
    /// Transmitted SSB index
    #[serde(default)]
    pub ssb_idx: u8,
}

impl Default for CellConfig {
    fn default() -> Self {
        Self {
            pci: default_pci(),
            l_max: default_l_max(),
            ssb_idx: 0,
        }
    }
}

fn default_pci() -> u16 {
    1
}

fn default_l_max() -> Lmax {
    Lmax::L8
}

/// MIB configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MibConfig {
    /// System frame number (0-1023)
    #[serde(default)]
    pub sfn: u16,
    /// Transmit in the second half frame
    #[serde(default)]
    pub hrf: bool,
    /// Common subcarrier spacing in kHz
    #[serde(default = "default_common_scs")]
    pub common_scs: u32,
    /// k_SSB subcarrier offset (0-31)
    #[serde(default)]
    pub k_ssb: u8,
    /// First PDSCH DMRS symbol (2 or 3)
    #[serde(default = "default_dmrs_type_a_position")]
    pub dmrs_type_a_position: u8,
    /// pdcch-ConfigSIB1
    #[serde(default = "default_pdcch_config_sib1")]
    pub pdcch_config_sib1: u8,
    /// Cell barred
    #[serde(default)]
    pub cell_barred: bool,
    /// Intra frequency reselection allowed
    #[serde(default = "default_intra_freq_reselection")]
    pub intra_freq_reselection: bool,
}

impl Default for MibConfig {
    fn default() -> Self {
        Self {
            sfn: 0,
            hrf: false,
            common_scs: default_common_scs(),
            k_ssb: 0,
            dmrs_type_a_position: default_dmrs_type_a_position(),
            pdcch_config_sib1: default_pdcch_config_sib1(),
            cell_barred: false,
            intra_freq_reselection: default_intra_freq_reselection(),
        }
    }
}

fn default_common_scs() -> u32 {
    15
}

fn default_dmrs_type_a_position() -> u8 {
    2
}

fn default_pdcch_config_sib1() -> u8 {
    0x60
}

fn default_intra_freq_reselection() -> bool {
    true
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl LoopbackConfig {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: &str) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    /// Parse configuration from a YAML document
    pub fn from_yaml_str(contents: &str) -> anyhow::Result<Self> {
        let config: LoopbackConfig = serde_yaml::from_str(contents)?;
        Ok(config)
    }

    /// Validated physical cell ID
    pub fn pci(&self) -> anyhow::Result<Pci> {
        Pci::new(self.cell.pci).ok_or_else(|| anyhow!("Invalid PCI: {}", self.cell.pci))
    }
}

impl MibConfig {
    /// Build the MIB, checking the fields against the frequency range of L_max
    pub fn to_mib(&self, l_max: Lmax) -> anyhow::Result<Mib> {
        if self.sfn > 1023 {
            return Err(anyhow!("Invalid SFN: {}", self.sfn));
        }
        if self.k_ssb > 31 {
            return Err(anyhow!("Invalid k_SSB: {}", self.k_ssb));
        }

        let scs = SubcarrierSpacing::from_khz(self.common_scs)
            .ok_or_else(|| anyhow!("Invalid subcarrier spacing: {} kHz", self.common_scs))?;
        let scs_fits = match scs {
            SubcarrierSpacing::Scs15 | SubcarrierSpacing::Scs30 => !l_max.carries_ssb_idx_msb(),
            SubcarrierSpacing::Scs60 | SubcarrierSpacing::Scs120 => l_max.carries_ssb_idx_msb(),
        };
        if !scs_fits {
            return Err(anyhow!(
                "Subcarrier spacing {} kHz cannot be signalled with L_max {}",
                self.common_scs,
                l_max.value()
            ));
        }

        let dmrs_type_a_position = match self.dmrs_type_a_position {
            2 => DmrsTypeAPosition::Pos2,
            3 => DmrsTypeAPosition::Pos3,
            other => return Err(anyhow!("Invalid DMRS type A position: {}", other)),
        };

        Ok(Mib {
            sfn_6msb: (self.sfn >> 4) as u8,
            subcarrier_spacing_common: scs,
            ssb_subcarrier_offset: self.k_ssb & 0xF,
            dmrs_type_a_position,
            pdcch_config_sib1: self.pdcch_config_sib1,
            cell_barred: self.cell_barred,
            intra_freq_reselection: self.intra_freq_reselection,
            spare: 0,
        })
    }
}
