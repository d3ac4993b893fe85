//! On-flash encoding of [`Settings`]
//!
//! ```text
//! [crc32: u32 LE][size: u32 LE][payload: size bytes][0xFF padding]
//! ```
//!
//! The CRC covers `size` and the payload. Payload fields are little endian and
//! appended in the order they were introduced, newer firmware only ever adds
//! fields at the end. Decoding reads the fields covered by the recorded size
//! and leaves the rest at their defaults, so images written by older firmware
//! load without a factory reset.

use crc::{CRC_32_ISO_HDLC, Crc};

use super::{CHAIN_COUNT, DeviceId, Settings};
use crate::color::ColorBalance;

/// CRC32 algorithm (ISO HDLC / Ethernet / ZIP)
const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// Bytes of checksum and size preceding the payload
pub const HEADER_SIZE: usize = 8;

/// Size of an encoded image including padding
pub const IMAGE_CAPACITY: usize = 256;

const MAX_PAYLOAD: usize = IMAGE_CAPACITY - HEADER_SIZE;
const DEVICE_ID_SIZE: usize = core::mem::size_of::<DeviceId>();

/// An encoded, checksummed settings record
#[derive(Clone)]
pub struct Image {
    bytes: [u8; IMAGE_CAPACITY],
    len: usize,
}

impl Image {
    /// Encode `settings` at the current layout
    pub fn encode(settings: &Settings) -> Self {
        let mut encoder = Encoder {
            bytes: [0xFF; IMAGE_CAPACITY],
            pos: HEADER_SIZE,
        };

        encoder.put_bytes(&settings.device_id);
        encoder.put_u32(settings.chains[0].length);
        encoder.put_bool(settings.autosave);
        encoder.put_u32(settings.scene);
        encoder.put_f32(settings.brightness);

        for chain in &settings.chains[1..] {
            encoder.put_u32(chain.length);
        }
        for chain in &settings.chains {
            encoder.put_u32(chain.offset);
        }

        for chain in &settings.chains {
            encoder.put_f32(chain.color_balance.r);
            encoder.put_f32(chain.color_balance.g);
            encoder.put_f32(chain.color_balance.b);
        }

        for chain in &settings.chains {
            encoder.put_f32(chain.gamma);
        }
        encoder.put_f32(settings.param);

        encoder.finish()
    }

    /// Decode and verify an image read from a slot
    ///
    /// Returns `None` if the size is implausible or the checksum does not
    /// match.
    pub fn decode(bytes: &[u8]) -> Option<Settings> {
        let header = bytes.get(..HEADER_SIZE)?;
        let stored_crc = u32::from_le_bytes(header[0..4].try_into().ok()?);
        let size = usize::try_from(u32::from_le_bytes(header[4..8].try_into().ok()?)).ok()?;
        if !(DEVICE_ID_SIZE..=MAX_PAYLOAD).contains(&size) {
            return None;
        }

        let covered = bytes.get(4..HEADER_SIZE + size)?;
        if CRC32.checksum(covered) != stored_crc {
            return None;
        }

        let mut decoder = Decoder {
            payload: &bytes[HEADER_SIZE..HEADER_SIZE + size],
            pos: 0,
        };
        let device_id: DeviceId = decoder.take(DEVICE_ID_SIZE)?.try_into().ok()?;
        let mut settings = Settings::defaults(device_id);

        settings.chains[0].length = decoder.u32_or(settings.chains[0].length);
        settings.autosave = decoder.bool_or(settings.autosave);
        settings.scene = decoder.u32_or(settings.scene);
        settings.brightness = decoder.f32_or(settings.brightness);

        for chain in &mut settings.chains[1..] {
            chain.length = decoder.u32_or(chain.length);
        }
        for chain in &mut settings.chains {
            chain.offset = decoder.u32_or(chain.offset);
        }

        for chain in &mut settings.chains {
            let balance = chain.color_balance;
            chain.color_balance = ColorBalance::new(
                decoder.f32_or(balance.r),
                decoder.f32_or(balance.g),
                decoder.f32_or(balance.b),
            );
        }

        for chain in &mut settings.chains {
            chain.gamma = decoder.f32_or(chain.gamma);
        }
        settings.param = decoder.f32_or(settings.param);

        Some(settings)
    }

    /// Checksum stored in the header
    pub fn checksum(&self) -> u32 {
        u32::from_le_bytes([self.bytes[0], self.bytes[1], self.bytes[2], self.bytes[3]])
    }

    /// Header plus payload, without padding
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    /// Image padded with erased bytes up to a multiple of `granularity`
    ///
    /// Returns `None` if that would exceed [`IMAGE_CAPACITY`].
    pub fn padded(&self, granularity: usize) -> Option<&[u8]> {
        let len = self.len.div_ceil(granularity.max(1)) * granularity.max(1);
        self.bytes.get(..len)
    }
}

/// Payload size written by the current firmware
pub const PAYLOAD_SIZE: usize = DEVICE_ID_SIZE
    + 4 // chain 0 length
    + 1 // autosave
    + 4 // scene
    + 4 // brightness
    + (CHAIN_COUNT - 1) * 4 // chain 1.. lengths
    + CHAIN_COUNT * 4 // offsets
    + CHAIN_COUNT * 12 // color balances
    + CHAIN_COUNT * 4 // gammas
    + 4; // param

const _: () = assert!(HEADER_SIZE + PAYLOAD_SIZE <= IMAGE_CAPACITY);

struct Encoder {
    bytes: [u8; IMAGE_CAPACITY],
    pos: usize,
}

impl Encoder {
    fn put_bytes(&mut self, data: &[u8]) {
        self.bytes[self.pos..self.pos + data.len()].copy_from_slice(data);
        self.pos += data.len();
    }

    fn put_u32(&mut self, value: u32) {
        self.put_bytes(&value.to_le_bytes());
    }

    fn put_f32(&mut self, value: f32) {
        self.put_bytes(&value.to_le_bytes());
    }

    fn put_bool(&mut self, value: bool) {
        self.put_bytes(&[u8::from(value)]);
    }

    #[allow(clippy::cast_possible_truncation)]
    fn finish(mut self) -> Image {
        let size = (self.pos - HEADER_SIZE) as u32;
        self.bytes[4..8].copy_from_slice(&size.to_le_bytes());
        let crc = CRC32.checksum(&self.bytes[4..self.pos]);
        self.bytes[0..4].copy_from_slice(&crc.to_le_bytes());
        Image {
            bytes: self.bytes,
            len: self.pos,
        }
    }
}

struct Decoder<'a> {
    payload: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    fn take(&mut self, len: usize) -> Option<&'a [u8]> {
        let data = self.payload.get(self.pos..self.pos + len)?;
        self.pos += len;
        Some(data)
    }

    fn u32_or(&mut self, default: u32) -> u32 {
        self.take(4)
            .and_then(|data| data.try_into().ok())
            .map_or(default, u32::from_le_bytes)
    }

    fn f32_or(&mut self, default: f32) -> f32 {
        self.take(4)
            .and_then(|data| data.try_into().ok())
            .map_or(default, f32::from_le_bytes)
    }

    fn bool_or(&mut self, default: bool) -> bool {
        self.take(1).map_or(default, |data| data[0] != 0)
    }
}
