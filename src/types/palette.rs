//! Indexed colour palettes for palette-encoded pixel art.

use std::collections::HashSet;

use crate::error::{PmugError, Result};

use super::Pixel;

/// Maximum number of entries in an input palette.
pub const MAX_PALETTE_SIZE: usize = 16;

/// An ordered list of 1 to 16 distinct colours, addressed by index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    colours: Vec<Pixel>,
    /// Each entry's hex string as written.
    spelling: Vec<String>,
}

impl Palette {
    /// Create a palette, validating its size and that entries are distinct.
    pub fn new(colours: Vec<Pixel>) -> Result<Self> {
        check_size(colours.len())?;

        let mut seen = HashSet::with_capacity(colours.len());
        for (i, colour) in colours.iter().enumerate() {
            if !seen.insert(*colour) {
                return Err(PmugError::Validation {
                    message: format!("Palette entry {} ({}) duplicates an earlier entry", i, colour),
                    help: Some("Palette colours must be distinct".to_string()),
                });
            }
        }

        let spelling = colours.iter().map(|c| c.to_hex()).collect();
        Ok(Self { colours, spelling })
    }

    /// Parse a palette from `#RRGGBB` strings.
    ///
    /// The size limit is checked before any entry is parsed.
    pub fn from_hex<S: AsRef<str>>(entries: &[S]) -> Result<Self> {
        check_size(entries.len())?;

        let colours = entries
            .iter()
            .enumerate()
            .map(|(i, s)| {
                Pixel::from_hex(s.as_ref()).map_err(|_| PmugError::Validation {
                    message: format!("Palette entry {} is not a valid colour: {:?}", i, s.as_ref()),
                    help: Some("Palette entries use #RRGGBB format".to_string()),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut palette = Self::new(colours)?;
        palette.spelling = entries.iter().map(|s| s.as_ref().to_string()).collect();
        Ok(palette)
    }

    /// Look up a colour by index.
    ///
    /// Takes a signed index so that negative values from JSON input are
    /// reported as range errors rather than wrapping.
    pub fn get(&self, index: i64) -> Result<Pixel> {
        self.entry(index).map(|(colour, _)| colour)
    }

    /// Look up a colour together with the hex string it was given as.
    pub fn entry(&self, index: i64) -> Result<(Pixel, &str)> {
        usize::try_from(index)
            .ok()
            .filter(|&i| i < self.colours.len())
            .map(|i| (self.colours[i], self.spelling[i].as_str()))
            .ok_or_else(|| PmugError::Validation {
                message: format!(
                    "Palette index {} is out of range (palette has {} colours)",
                    index,
                    self.colours.len()
                ),
                help: Some(format!("Indices must be between 0 and {}", self.colours.len() - 1)),
            })
    }

    /// Get the number of colours.
    pub fn len(&self) -> usize {
        self.colours.len()
    }

    /// Always false: palettes hold at least one colour.
    pub fn is_empty(&self) -> bool {
        self.colours.is_empty()
    }

    /// The colours in index order.
    pub fn colours(&self) -> &[Pixel] {
        &self.colours
    }
}

fn check_size(len: usize) -> Result<()> {
    if len == 0 {
        return Err(PmugError::Validation {
            message: "Palette is empty".to_string(),
            help: Some("Provide between 1 and 16 colours".to_string()),
        });
    }
    if len > MAX_PALETTE_SIZE {
        return Err(PmugError::Validation {
            message: format!(
                "Palette has {} colours, maximum is {}",
                len, MAX_PALETTE_SIZE
            ),
            help: Some("Reduce the palette to 16 colours or fewer".to_string()),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_from_hex() {
        let palette = Palette::from_hex(&["#ffffff", "#ff0000"]).unwrap();
        assert_eq!(palette.len(), 2);
        assert_eq!(palette.get(1).unwrap(), Pixel::rgb(255, 0, 0));
    }

    #[test]
    fn test_entry_keeps_spelling() {
        let palette = Palette::from_hex(&["#ffffff", "#Ff0000"]).unwrap();
        assert_eq!(palette.entry(0).unwrap(), (Pixel::WHITE, "#ffffff"));
        assert_eq!(palette.entry(1).unwrap(), (Pixel::rgb(255, 0, 0), "#Ff0000"));

        let built = Palette::new(vec![Pixel::rgb(0xAB, 0, 0)]).unwrap();
        assert_eq!(built.entry(0).unwrap().1, "#AB0000");
    }

    #[test]
    fn test_index_out_of_range() {
        let palette = Palette::from_hex(&["#ffffff", "#ff0000"]).unwrap();
        assert_eq!(palette.get(2).unwrap_err().kind(), ErrorKind::ValidationError);
        assert_eq!(palette.get(-1).unwrap_err().kind(), ErrorKind::ValidationError);
    }

    #[test]
    fn test_oversized_palette_rejected_regardless_of_content() {
        let entries: Vec<String> = (0..20).map(|i| format!("#{:06x}", i)).collect();
        let err = Palette::from_hex(&entries).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError);

        // Invalid entries do not change the classification
        let junk = vec!["not-a-colour"; 17];
        assert!(Palette::from_hex(&junk).unwrap_err().to_string().contains("maximum is 16"));
    }

    #[test]
    fn test_sixteen_colours_allowed() {
        let entries: Vec<String> = (0..16).map(|i| format!("#{:06x}", i * 1000)).collect();
        assert_eq!(Palette::from_hex(&entries).unwrap().len(), 16);
    }

    #[test]
    fn test_empty_and_duplicate_rejected() {
        assert!(Palette::from_hex::<&str>(&[]).is_err());
        assert!(Palette::from_hex(&["#000000", "#000000"]).is_err());
    }

    #[test]
    fn test_invalid_entry() {
        assert!(Palette::from_hex(&["#000000", "red"]).is_err());
    }
}
