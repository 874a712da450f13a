//! SS/PBCH Block Resource Grid
//!
//! Implements the PBCH and PBCH DM-RS resource element layout within an
//! SS/PBCH block according to 3GPP TS 38.211 Section 7.4.3.1

use crate::PhyError;
use num_complex::Complex32;
use tracing::debug;

/// Subcarriers spanned by an SS/PBCH block (20 RBs)
pub const SSB_BW_SUBC: usize = 240;
/// OFDM symbols in an SS/PBCH block
pub const SSB_DURATION_NSYMB: usize = 4;
/// Resource elements in an SS/PBCH block
pub const SSB_NOF_RE: usize = SSB_BW_SUBC * SSB_DURATION_NSYMB;

/// PBCH data resource elements per SS/PBCH block
pub const PBCH_NOF_DATA_RE: usize = 432;
/// PBCH DM-RS resource elements per SS/PBCH block
pub const PBCH_NOF_DMRS: usize = 144;

/// Upper edge of the lower PBCH band in symbol 2
const SYMBOL2_LOW_BAND_END: usize = 48;
/// Lower edge of the upper PBCH band in symbol 2
const SYMBOL2_HIGH_BAND_START: usize = 192;

/// Position of a resource element inside an SS/PBCH block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SsbRe {
    /// OFDM symbol within the block (0..4)
    pub symbol: u8,
    /// Subcarrier within the block (0..240)
    pub subcarrier: u8,
}

impl SsbRe {
    /// Linear index in a symbol-major SS/PBCH block buffer
    pub fn index(&self) -> usize {
        self.symbol as usize * SSB_BW_SUBC + self.subcarrier as usize
    }
}

/// PBCH resource element map of one cell
///
/// Both tables are in mapping order: increasing subcarrier first, then symbol.
#[derive(Debug, Clone)]
pub struct SsbReMap {
    /// DM-RS shift v = N_id mod 4
    dmrs_shift: usize,
    /// Grid indices carrying PBCH data symbols
    data: [u16; PBCH_NOF_DATA_RE],
    /// Grid indices carrying PBCH DM-RS
    dmrs: [u16; PBCH_NOF_DMRS],
}

impl SsbReMap {
    /// Build the map for DM-RS shift `v`
    pub fn new(dmrs_shift: usize) -> Self {
        debug_assert!(dmrs_shift < 4);

        let mut data = [0u16; PBCH_NOF_DATA_RE];
        let mut dmrs = [0u16; PBCH_NOF_DMRS];
        let mut data_count = 0;
        let mut dmrs_count = 0;

        let symbol_2_bands =
            (0..SYMBOL2_LOW_BAND_END).chain(SYMBOL2_HIGH_BAND_START..SSB_BW_SUBC);
        let rows = (0..SSB_BW_SUBC)
            .map(|k| (1, k))
            .chain(symbol_2_bands.map(|k| (2, k)))
            .chain((0..SSB_BW_SUBC).map(|k| (3, k)));

        for (symbol, subcarrier) in rows {
            let re = SsbRe {
                symbol,
                subcarrier: subcarrier as u8,
            };
            let idx = re.index() as u16;
            if subcarrier % 4 == dmrs_shift {
                dmrs[dmrs_count] = idx;
                dmrs_count += 1;
            } else {
                data[data_count] = idx;
                data_count += 1;
            }
        }

        // The tables are full exactly when the layout is consistent
        debug_assert_eq!(data_count, PBCH_NOF_DATA_RE);
        debug_assert_eq!(dmrs_count, PBCH_NOF_DMRS);

        Self {
            dmrs_shift,
            data,
            dmrs,
        }
    }

    pub fn dmrs_shift(&self) -> usize {
        self.dmrs_shift
    }

    /// Grid indices of the PBCH data REs
    pub fn data_indices(&self) -> &[u16] {
        &self.data
    }

    /// Grid indices of the PBCH DM-RS REs
    pub fn dmrs_indices(&self) -> &[u16] {
        &self.dmrs
    }

    /// Whether a subcarrier is reserved for DM-RS in the PBCH symbols
    pub fn is_dmrs_subcarrier(&self, subcarrier: usize) -> bool {
        subcarrier % 4 == self.dmrs_shift
    }

    /// Write PBCH data symbols into the SS/PBCH block grid
    pub fn map(&self, symbols: &[Complex32], grid: &mut [Complex32]) -> Result<(), PhyError> {
        check_lengths(symbols.len(), PBCH_NOF_DATA_RE, grid.len())?;
        for (&idx, &symbol) in self.data.iter().zip(symbols) {
            grid[idx as usize] = symbol;
        }
        debug!("Mapped {} PBCH symbols (v={})", PBCH_NOF_DATA_RE, self.dmrs_shift);
        Ok(())
    }

    /// Read PBCH data symbols out of the SS/PBCH block grid
    pub fn demap(&self, grid: &[Complex32], symbols: &mut [Complex32]) -> Result<(), PhyError> {
        check_lengths(symbols.len(), PBCH_NOF_DATA_RE, grid.len())?;
        for (&idx, symbol) in self.data.iter().zip(symbols.iter_mut()) {
            *symbol = grid[idx as usize];
        }
        Ok(())
    }

    /// Write DM-RS symbols into the SS/PBCH block grid
    pub fn map_dmrs(&self, symbols: &[Complex32], grid: &mut [Complex32]) -> Result<(), PhyError> {
        check_lengths(symbols.len(), PBCH_NOF_DMRS, grid.len())?;
        for (&idx, &symbol) in self.dmrs.iter().zip(symbols) {
            grid[idx as usize] = symbol;
        }
        Ok(())
    }

    /// Read DM-RS symbols out of the SS/PBCH block grid
    pub fn demap_dmrs(
        &self,
        grid: &[Complex32],
        symbols: &mut [Complex32],
    ) -> Result<(), PhyError> {
        check_lengths(symbols.len(), PBCH_NOF_DMRS, grid.len())?;
        for (&idx, symbol) in self.dmrs.iter().zip(symbols.iter_mut()) {
            *symbol = grid[idx as usize];
        }
        Ok(())
    }
}

fn check_lengths(symbols: usize, expected: usize, grid: usize) -> Result<(), PhyError> {
    if symbols < expected {
        return Err(PhyError::InvalidInput(format!(
            "Expected {} symbols, got {}",
            expected, symbols
        )));
    }
    if grid < SSB_NOF_RE {
        return Err(PhyError::InvalidInput(format!(
            "SS/PBCH block grid must hold {} REs, got {}",
            SSB_NOF_RE, grid
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ssb_re(index: usize) -> SsbRe {
        SsbRe {
            symbol: (index / SSB_BW_SUBC) as u8,
            subcarrier: (index % SSB_BW_SUBC) as u8,
        }
    }

    #[test]
    fn test_re_counts_for_all_shifts() {
        for v in 0..4 {
            let map = SsbReMap::new(v);
            assert_eq!(map.data_indices().len(), PBCH_NOF_DATA_RE);
            assert_eq!(map.dmrs_indices().len(), PBCH_NOF_DMRS);
            assert_eq!(PBCH_NOF_DATA_RE + PBCH_NOF_DMRS, 2 * SSB_BW_SUBC + 48 + 48);
        }
    }

    #[test]
    fn test_dmrs_positions_follow_shift() {
        for v in 0..4 {
            let map = SsbReMap::new(v);
            for &idx in map.dmrs_indices() {
                let re = ssb_re(idx as usize);
                assert_eq!(re.subcarrier as usize % 4, v);
                assert!((1..=3).contains(&re.symbol));
            }
            for &idx in map.data_indices() {
                let re = ssb_re(idx as usize);
                assert!(!map.is_dmrs_subcarrier(re.subcarrier as usize));
            }
        }
    }

    #[test]
    fn test_symbol_2_middle_band_untouched() {
        let map = SsbReMap::new(1);
        for &idx in map.data_indices().iter().chain(map.dmrs_indices()) {
            let re = ssb_re(idx as usize);
            if re.symbol == 2 {
                let k = re.subcarrier as usize;
                assert!(k < 48 || k >= 192, "subcarrier {} in SSS band", k);
            }
            assert_ne!(re.symbol, 0);
        }
    }

    #[test]
    fn test_mapping_order_is_strictly_increasing() {
        let map = SsbReMap::new(2);
        assert!(map.data_indices().windows(2).all(|w| w[0] < w[1]));
        assert!(map.dmrs_indices().windows(2).all(|w| w[0] < w[1]));
        // First data RE of symbol 1 for v = 2 is subcarrier 0
        let first_data = SsbRe {
            symbol: 1,
            subcarrier: 0,
        };
        let first_dmrs = SsbRe {
            symbol: 1,
            subcarrier: 2,
        };
        assert_eq!(ssb_re(map.data_indices()[0] as usize), first_data);
        assert_eq!(first_dmrs.index(), SSB_BW_SUBC + 2);
        assert_eq!(map.dmrs_indices()[0] as usize, first_dmrs.index());
    }

    #[test]
    fn test_map_demap_roundtrip() {
        let map = SsbReMap::new(3);
        let symbols: Vec<Complex32> = (0..PBCH_NOF_DATA_RE)
            .map(|i| Complex32::new(i as f32, -(i as f32)))
            .collect();
        let mut grid = vec![Complex32::new(0.0, 0.0); SSB_NOF_RE];
        map.map(&symbols, &mut grid).unwrap();

        // Nothing outside the data REs is written
        let written = grid.iter().filter(|s| s.norm() > 0.0).count();
        assert_eq!(written, PBCH_NOF_DATA_RE - 1);

        let mut recovered = vec![Complex32::new(0.0, 0.0); PBCH_NOF_DATA_RE];
        map.demap(&grid, &mut recovered).unwrap();
        assert_eq!(recovered, symbols);
    }

    #[test]
    fn test_short_grid_rejected() {
        let map = SsbReMap::new(0);
        let symbols = vec![Complex32::new(0.0, 0.0); PBCH_NOF_DATA_RE];
        let mut grid = vec![Complex32::new(0.0, 0.0); SSB_NOF_RE - 1];
        assert!(map.map(&symbols, &mut grid).is_err());
    }
}
