//! Dual-slot flash persistence for [`Settings`]
//!
//! Two redundant slots, one erase sector each, near the top of flash. A save
//! rewrites one slot completely before touching the other, and the slot
//! holding the last good image always goes last, so power loss at any point
//! leaves at least one slot with a valid checksum once any save has
//! completed.

use embassy_time::Instant;
use embedded_storage::nor_flash::NorFlash;

use super::image::{IMAGE_CAPACITY, Image};
use super::{DeviceId, Settings};
use crate::config::{FLASH_SECTOR_SIZE, FLASH_SIZE, SAVE_COOLDOWN};

/// Flash offsets of the two settings slots
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlashLayout {
    /// Slot A first: it is read first and written first
    pub slots: [u32; 2],
}

impl FlashLayout {
    /// Last two sectors of a flash part
    pub const fn top_of(flash_size: u32, sector_size: u32) -> Self {
        Self {
            slots: [flash_size - 2 * sector_size, flash_size - sector_size],
        }
    }
}

impl Default for FlashLayout {
    fn default() -> Self {
        Self::top_of(FLASH_SIZE, FLASH_SECTOR_SIZE)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StoreError {
    /// Neither slot holds a valid image
    NotFound,
    /// Flash erase or program failed
    Flash,
}

impl core::fmt::Display for StoreError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => f.write_str("no valid settings image"),
            Self::Flash => f.write_str("flash write failed"),
        }
    }
}

/// Settings record backed by two flash slots
pub struct SettingsStore<F> {
    flash: F,
    layout: FlashLayout,
    device_id: DeviceId,
    current: Settings,
    /// Checksum of the image last known to be on flash
    durable_crc: Option<u32>,
    /// Stored checksum of each slot, `None` while a slot is torn or blank
    slot_crc: [Option<u32>; 2],
    /// Slot holding the last good image
    source: Option<usize>,
    last_write: Option<Instant>,
}

impl<F: NorFlash> SettingsStore<F> {
    /// Load the record from flash, falling back to defaults
    ///
    /// A record written on another board is treated like a first launch.
    /// Out-of-range fields are corrected; a defaulted or corrected record
    /// stays dirty until the next save.
    pub fn open(flash: F, layout: FlashLayout, device_id: DeviceId, scene_count: usize) -> Self {
        let mut store = Self {
            flash,
            layout,
            device_id,
            current: Settings::defaults(device_id),
            durable_crc: None,
            slot_crc: [None; 2],
            source: None,
            last_write: None,
        };

        match store.load() {
            Ok(settings) if settings.device_id == device_id => {
                store.durable_crc = Some(Image::encode(&settings).checksum());
                store.current = settings;
            }
            Ok(_) => {
                #[cfg(feature = "defmt")]
                defmt::info!("settings: written on another device, using defaults");
            }
            Err(_) => {
                #[cfg(feature = "defmt")]
                defmt::info!("settings: first launch or corrupt image, using defaults");
            }
        }

        if store.current.validate(scene_count) {
            #[cfg(feature = "defmt")]
            defmt::warn!("settings: some settings failed validation and have been reset");
        }

        store
    }

    /// Read the first slot holding a valid image
    ///
    /// Also records which slots are intact, so the next save knows which
    /// one it may overwrite first.
    pub fn load(&mut self) -> Result<Settings, StoreError> {
        let mut loaded = None;
        for index in 0..self.layout.slots.len() {
            let slot = self.read_slot(index);
            self.slot_crc[index] = slot.as_ref().map(|&(_, crc)| crc);
            match slot {
                Some(slot) => {
                    loaded.get_or_insert(slot);
                }
                None => {
                    #[cfg(feature = "defmt")]
                    defmt::warn!("settings: slot at {=u32:#x} is invalid", self.layout.slots[index]);
                }
            }
        }

        let (settings, crc) = loaded.ok_or(StoreError::NotFound)?;
        self.source = (0..self.slot_crc.len())
            .rev()
            .find(|&index| self.slot_crc[index] == Some(crc));
        Ok(settings)
    }

    fn read_slot(&mut self, index: usize) -> Option<(Settings, u32)> {
        let mut bytes = [0u8; IMAGE_CAPACITY];
        self.flash.read(self.layout.slots[index], &mut bytes).ok()?;
        let settings = Image::decode(&bytes)?;
        Some((settings, u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])))
    }

    /// Persist the record if it changed
    ///
    /// Unless `force` is set, a write is deferred while the last physical
    /// write is less than [`SAVE_COOLDOWN`] ago; the first write after boot is
    /// never deferred. Returns `Ok(true)` if flash was written and `Ok(false)`
    /// if it was already up to date or the write was deferred. On error the
    /// record stays dirty.
    pub fn save(&mut self, now: Instant, force: bool) -> Result<bool, StoreError> {
        let image = Image::encode(&self.current);
        if self.durable_crc == Some(image.checksum()) {
            return Ok(false);
        }

        if !force {
            if let Some(last_write) = self.last_write {
                if now.saturating_duration_since(last_write) < SAVE_COOLDOWN {
                    return Ok(false);
                }
            }
        }

        // Torn slots first, then stale ones, the last good image last
        let order = if self.write_rank(1) < self.write_rank(0) {
            [1, 0]
        } else {
            [0, 1]
        };
        for index in order {
            if let Err(err) = self.write_slot(self.layout.slots[index], &image) {
                self.slot_crc[index] = None;
                return Err(err);
            }
            self.slot_crc[index] = Some(image.checksum());
            self.source = Some(index);
        }

        #[cfg(feature = "defmt")]
        defmt::info!("settings: written to flash");

        self.durable_crc = Some(image.checksum());
        self.last_write = Some(now);
        Ok(true)
    }

    fn write_rank(&self, index: usize) -> u8 {
        match self.slot_crc[index] {
            None => 0,
            Some(_) if self.source == Some(index) => 2,
            Some(_) => 1,
        }
    }

    fn write_slot(&mut self, offset: u32, image: &Image) -> Result<(), StoreError> {
        let data = image.padded(F::WRITE_SIZE).ok_or(StoreError::Flash)?;
        let erase_end = offset
            .checked_add(u32::try_from(F::ERASE_SIZE).map_err(|_| StoreError::Flash)?)
            .ok_or(StoreError::Flash)?;
        let flash = &mut self.flash;

        // Nothing may run from flash while it is erased and programmed
        critical_section::with(|_| {
            flash.erase(offset, erase_end)?;
            flash.write(offset, data)
        })
        .map_err(|_| {
            #[cfg(feature = "defmt")]
            defmt::error!("settings: flash write at {=u32:#x} failed", offset);
            StoreError::Flash
        })
    }

    /// Whether the record differs from the image on flash
    pub fn is_dirty(&self) -> bool {
        self.durable_crc != Some(Image::encode(&self.current).checksum())
    }

    /// Reset every field except the device identity to its default
    pub fn restore_defaults(&mut self) {
        self.current = Settings::defaults(self.device_id);
    }

    pub fn settings(&self) -> &Settings {
        &self.current
    }

    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.current
    }

    pub const fn device_id(&self) -> DeviceId {
        self.device_id
    }

    /// Give the flash back, e.g. to reopen it after a simulated power cycle
    pub fn into_flash(self) -> F {
        self.flash
    }
}
