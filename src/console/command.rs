use core::str::{FromStr, SplitWhitespace};

use crate::bounds::MAX_CHAIN_END;
use crate::color::{ColorBalance, Rgb};
use crate::scene::SCENE_COUNT;
use crate::settings::{CHAIN_COUNT, is_unit};

/// A parsed console command
///
/// Parsing checks everything that does not depend on the current buffer or
/// chain layout; the rest is checked when the command is executed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// `count <chain> <n>`
    Count { chain: usize, count: u32 },
    /// `offset <chain> <n>`
    Offset { chain: usize, offset: u32 },
    /// `color <chain> <r> <g> <b>`
    Color { chain: usize, balance: ColorBalance },
    /// `gamma <chain> <g>`
    Gamma { chain: usize, gamma: f32 },
    /// `scene <n>`
    Scene(u32),
    /// `brightness <f>`
    Brightness(f32),
    /// `param <f>`
    Param(f32),
    /// `autosave <0|1>`, any non-zero value enables
    Autosave(bool),
    Defaults,
    Flash,
    /// `poke <i> <r> <g> <b>`
    Poke { index: usize, color: Rgb },
    /// `fill <r> <g> <b>`
    Fill(Rgb),
    /// `fillr <begin> <end> <r> <g> <b>`, end exclusive
    FillRange { begin: usize, end: usize, color: Rgb },
    /// `grad <r1> <g1> <b1> <r2> <g2> <b2>`
    Gradient(Rgb, Rgb),
    Dump,
    Halt,
    Resume,
    Reboot,
    Prog,
    Info,
}

/// Command failures, displayed verbatim on the console
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandError {
    Unknown,
    /// Missing or unparsable argument
    Malformed,
    BadChain,
    BadCount,
    BadOffset,
    BadScene,
    OutOfRange,
    IndexOutOfRange,
    FlashWrite,
}

impl core::fmt::Display for CommandError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Self::Unknown => "unknown command",
            Self::Malformed => "error",
            Self::BadChain => "error bad chain id",
            Self::BadCount => "error bad count",
            Self::BadOffset => "error bad offset",
            Self::BadScene => "error bad scene",
            Self::OutOfRange => "error value out of range",
            Self::IndexOutOfRange => "error invalid index",
            Self::FlashWrite => "error flash write failed",
        })
    }
}

impl Command {
    /// Parse a console line
    ///
    /// Returns `Ok(None)` for a blank line. Extra trailing arguments are
    /// ignored.
    pub fn parse(line: &str) -> Result<Option<Self>, CommandError> {
        let mut args = Args(line.split_whitespace());
        let Some(name) = args.0.next() else {
            return Ok(None);
        };

        let command = match name {
            "count" => {
                let chain = args.chain()?;
                let count: i64 = args.next()?;
                if !(0..=i64::from(MAX_CHAIN_END)).contains(&count) {
                    return Err(CommandError::BadCount);
                }
                Self::Count {
                    chain,
                    count: u32::try_from(count).map_err(|_| CommandError::BadCount)?,
                }
            }
            "offset" => {
                let chain = args.chain()?;
                let offset: i64 = args.next()?;
                if !(0..=i64::from(MAX_CHAIN_END)).contains(&offset) {
                    return Err(CommandError::BadOffset);
                }
                Self::Offset {
                    chain,
                    offset: u32::try_from(offset).map_err(|_| CommandError::BadOffset)?,
                }
            }
            "color" => {
                let chain = args.chain()?;
                let balance = ColorBalance::new(args.next()?, args.next()?, args.next()?);
                if ![balance.r, balance.g, balance.b]
                    .iter()
                    .all(|component| component.is_finite() && *component >= 0.0)
                {
                    return Err(CommandError::OutOfRange);
                }
                Self::Color { chain, balance }
            }
            "gamma" => {
                let chain = args.chain()?;
                let gamma: f32 = args.next()?;
                if !(gamma.is_finite() && gamma > 0.0) {
                    return Err(CommandError::OutOfRange);
                }
                Self::Gamma { chain, gamma }
            }
            "scene" => {
                let scene: i64 = args.next()?;
                match usize::try_from(scene) {
                    Ok(index) if index < SCENE_COUNT => {
                        Self::Scene(u32::try_from(scene).map_err(|_| CommandError::BadScene)?)
                    }
                    _ => return Err(CommandError::BadScene),
                }
            }
            "brightness" => Self::Brightness(args.unit()?),
            "param" => Self::Param(args.unit()?),
            "autosave" => Self::Autosave(args.next::<i64>()? != 0),
            "defaults" => Self::Defaults,
            "flash" => Self::Flash,
            "poke" => Self::Poke {
                index: args.index()?,
                color: args.color()?,
            },
            "fill" => Self::Fill(args.color()?),
            "fillr" => Self::FillRange {
                begin: args.index()?,
                end: args.index()?,
                color: args.color()?,
            },
            "grad" => Self::Gradient(args.color()?, args.color()?),
            "dump" => Self::Dump,
            "halt" => Self::Halt,
            "resume" => Self::Resume,
            "reboot" => Self::Reboot,
            "prog" => Self::Prog,
            "info" => Self::Info,
            _ => return Err(CommandError::Unknown),
        };

        Ok(Some(command))
    }
}

struct Args<'a>(SplitWhitespace<'a>);

impl Args<'_> {
    fn next<T: FromStr>(&mut self) -> Result<T, CommandError> {
        self.0
            .next()
            .and_then(|arg| arg.parse().ok())
            .ok_or(CommandError::Malformed)
    }

    fn chain(&mut self) -> Result<usize, CommandError> {
        let chain: i64 = self.next()?;
        usize::try_from(chain)
            .ok()
            .filter(|&chain| chain < CHAIN_COUNT)
            .ok_or(CommandError::BadChain)
    }

    fn unit(&mut self) -> Result<f32, CommandError> {
        let value: f32 = self.next()?;
        if is_unit(value) {
            Ok(value)
        } else {
            Err(CommandError::OutOfRange)
        }
    }

    /// Buffer index, negative values can never be valid
    fn index(&mut self) -> Result<usize, CommandError> {
        let index: i64 = self.next()?;
        usize::try_from(index).map_err(|_| CommandError::IndexOutOfRange)
    }

    fn color(&mut self) -> Result<Rgb, CommandError> {
        Ok(Rgb {
            r: self.next()?,
            g: self.next()?,
            b: self.next()?,
        })
    }
}
