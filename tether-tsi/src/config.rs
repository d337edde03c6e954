//! configuration
//! 
//! control register layout, chunking limits and the simulated target
//! memory map. every field has a default so partial yaml documents work

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::command::WORD_SIZE;
use crate::control::{MSIP_BASE, NHARTS_MAX, SCR_BASE};

#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot parse configuration: {0}")]
    Parse(serde_yaml::Error),
    #[error("cannot parse configuration from `{0}`: {1}")]
    ParseFile(PathBuf, serde_yaml::Error),
    #[error("cannot read configuration from `{0}`: {1}")]
    ReadFile(PathBuf, io::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// fixed control addresses on the target
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlMap {
    /// base of the system control registers
    pub scr_base: u64,
    /// base of the per-hart software interrupt registers
    pub msip_base: u64,
    pub max_harts: usize,
}

impl Default for ControlMap {
    fn default() -> Self {
        Self {
            scr_base: SCR_BASE,
            msip_base: MSIP_BASE,
            max_harts: NHARTS_MAX,
        }
    }
}

/// host side protocol settings
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TsiConfig {
    pub control: ControlMap,
    /// alignment of every chunk sent on the wire, in bytes
    pub chunk_align: usize,
    /// largest chunk a single command may carry, in bytes
    pub chunk_max_size: usize,
}

impl Default for TsiConfig {
    fn default() -> Self {
        Self {
            control: ControlMap::default(),
            chunk_align: WORD_SIZE,
            chunk_max_size: 1024,
        }
    }
}

impl TsiConfig {
    pub fn validate(&self) -> Result<(), Error> {
        let align = self.chunk_align;
        if align < WORD_SIZE || !align.is_power_of_two() {
            return Err(Error::Invalid(format!(
                "chunk_align {align} must be a power of two of at least {WORD_SIZE}")));
        }
        if self.chunk_max_size < align || self.chunk_max_size % align != 0 {
            return Err(Error::Invalid(format!(
                "chunk_max_size {} must be a non-zero multiple of chunk_align {align}",
                self.chunk_max_size)));
        }
        if self.control.max_harts == 0 {
            return Err(Error::Invalid("max_harts must be at least 1".into()));
        }
        Ok(())
    }
}

/// kind of memory backing a simulated target region
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionKind {
    Ram,
    Registers,
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct RegionConfig {
    pub name: String,
    pub kind: RegionKind,
    pub base: u64,
    pub size: usize,
}

/// simulated target settings
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    /// depth of the target receive fifo, in words
    pub rx_depth: usize,
    /// ram regions, the control register blocks are always mapped
    pub regions: Vec<RegionConfig>,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            rx_depth: 16,
            regions: vec![RegionConfig {
                name: String::from("dram"),
                kind: RegionKind::Ram,
                base: 0x8000_0000,
                size: 0x10_0000,
            }],
        }
    }
}

/// complete session settings
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// simulated seconds per clock step
    pub clock_resolution: f64,
    pub tsi: TsiConfig,
    pub target: TargetConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            clock_resolution: 1e-8,
            tsi: TsiConfig::default(),
            target: TargetConfig::default(),
        }
    }
}

impl SessionConfig {
    pub fn from_str(input: impl AsRef<str>) -> Result<Self, Error> {
        let config: Self = serde_yaml::from_str(input.as_ref()).map_err(Error::Parse)?;
        config.tsi.validate()?;
        Ok(config)
    }

    pub fn from_reader(reader: impl Read) -> Result<Self, Error> {
        let config: Self = serde_yaml::from_reader(reader).map_err(Error::Parse)?;
        config.tsi.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let file = BufReader::new(
            File::open(path).map_err(|e| Error::ReadFile(path.to_owned(), e))?,
        );
        let config: Self = serde_yaml::from_reader(file)
            .map_err(|e| Error::ParseFile(path.to_owned(), e))?;
        config.tsi.validate()?;
        Ok(config)
    }
}
