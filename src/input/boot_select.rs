/// Access to the flash chip-select line doubling as a button input
///
/// While the line is floated the flash is unreachable, so implementations and
/// everything called between [`ChipSelectOverride::float_high_impedance`] and
/// [`ChipSelectOverride::restore`] must run from RAM.
pub trait ChipSelectOverride {
    /// Stop driving chip-select so the button can pull it low
    fn float_high_impedance(&mut self);

    /// Hand chip-select back to the flash controller
    fn restore(&mut self);

    /// Current level of the floated line
    fn is_low(&mut self) -> bool;

    /// Wait for the line to settle after floating it
    fn settle(&mut self) {
        for _ in 0..1000 {
            core::hint::spin_loop();
        }
    }
}

/// Boot-select button read through a [`ChipSelectOverride`]
pub struct BootSelect<C> {
    chip_select: C,
}

impl<C: ChipSelectOverride> BootSelect<C> {
    pub const fn new(chip_select: C) -> Self {
        Self { chip_select }
    }

    /// Whether the button is pressed (line pulled low)
    ///
    /// Runs with interrupts masked, handlers may live in flash.
    pub fn sample(&mut self) -> bool {
        let chip_select = &mut self.chip_select;
        critical_section::with(|_| {
            chip_select.float_high_impedance();
            chip_select.settle();
            let pressed = chip_select.is_low();
            chip_select.restore();
            pressed
        })
    }
}
