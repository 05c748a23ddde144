//! Core registers and system peripherals common to all ARMv7-M and ARMv7E-M devices
use crate::{bits::BitField, error::CatalogError};

use super::{Catalog, RegisterDescriptor};

/// Builds the catalog. Chip specific peripherals can be added with [`Catalog::insert`].
pub fn catalog() -> Result<Catalog, CatalogError> {
    let mut registers = core_registers()?;
    registers.extend(systick()?);
    registers.extend(scb()?);
    Catalog::from_registers(registers)
}

fn bit(name: &str, position: u8, description: &str) -> Result<BitField, CatalogError> {
    Ok(BitField::bit(name, position)?.with_description(description))
}

fn core_registers() -> Result<Vec<RegisterDescriptor>, CatalogError> {
    let mut registers: Vec<RegisterDescriptor> = (0..13)
        .map(|i| {
            RegisterDescriptor::core(format!("R{}", i), format!("r{}", i))
                .with_description(format!("General purpose register {}", i))
        })
        .collect();

    registers.extend([
        RegisterDescriptor::core("SP", "sp").with_description("Stack pointer"),
        RegisterDescriptor::core("MSP", "msp").with_description("Main stack pointer"),
        RegisterDescriptor::core("PSP", "psp").with_description("Process stack pointer"),
        RegisterDescriptor::core("LR", "lr").with_description("Link register"),
        RegisterDescriptor::core("PC", "pc").with_description("Program counter"),
    ]);

    registers.push(
        RegisterDescriptor::core("xPSR", "xPSR")
            .with_description("Combined program status register")
            .with_fields([
                bit("APSR:N", 31, "Negative flag")?,
                bit("APSR:Z", 30, "Zero flag")?,
                bit("APSR:C", 29, "Carry or borrow flag")?,
                bit("APSR:V", 28, "Overflow flag")?,
                bit("APSR:Q", 27, "DSP overflow and saturation flag")?,
                BitField::new("APSR:GE", 16..20)?.with_description("Greater than or equal flags"),
                BitField::new("IPSR:ISR_NUMBER", 0..9)?
                    .with_description("Number of the current exception")
                    .with_value(0, "Thread mode"),
                BitField::new("EPSR:ICI/IT", (10..16).chain(25..27))?.with_description(
                    "Interruptible-continuable instruction bits / IT instruction state bits",
                ),
                bit("EPSR:T", 24, "Thumb state bit")?,
            ]),
    );

    registers.extend([
        RegisterDescriptor::core("PRIMASK", "primask")
            .with_description("Priority mask register")
            .with_field(
                bit("PRIMASK", 0, "Priority mask")?
                    .with_value(0, "no effect")
                    .with_value(
                        1,
                        "Prevents the activation of all exceptions with configurable priority",
                    ),
            ),
        RegisterDescriptor::core("FAULTMASK", "faultmask")
            .with_description("Fault mask register")
            .with_field(
                bit("FAULTMASK", 0, "Fault mask")?
                    .with_value(0, "no effect")
                    .with_value(1, "Prevents the activation of all exceptions except for NMI"),
            ),
        RegisterDescriptor::core("BASEPRI", "basepri")
            .with_description("Base priority mask register")
            .with_field(
                BitField::new("BASEPRI", 0..8)?
                    .with_description("Priority mask bits")
                    .with_value(0, "no effect"),
            ),
        RegisterDescriptor::core("CONTROL", "control")
            .with_description("Control register")
            .with_fields([
                bit("nPRIV", 0, "Thread mode privilege level")?
                    .with_value(0, "Privileged")
                    .with_value(1, "Unprivileged"),
                bit("SPSEL", 1, "Current stack")?
                    .with_value(0, "MSP is the current stack pointer")
                    .with_value(1, "PSP is the current stack pointer"),
                bit("FPCA", 2, "Floating-point context active")?
                    .with_value(0, "No floating-point context active")
                    .with_value(1, "Floating-point context active"),
            ]),
    ]);
    Ok(registers)
}

fn systick() -> Result<Vec<RegisterDescriptor>, CatalogError> {
    Ok(vec![
        RegisterDescriptor::mmap("SYST_CSR", 0xE000_E010)
            .with_description("SysTick control and status register")
            .with_fields([
                bit("ENABLE", 0, "Enables the counter")?
                    .with_value(0, "Counter disabled")
                    .with_value(1, "Counter enabled"),
                bit("TICKINT", 1, "Enables the SysTick exception request")?
                    .with_value(
                        0,
                        "Counting down to zero does not assert the SysTick exception request",
                    )
                    .with_value(1, "Counting down to zero asserts the SysTick exception request"),
                bit("CLKSOURCE", 2, "Clock source")?
                    .with_value(0, "External clock")
                    .with_value(1, "Processor clock"),
                bit(
                    "COUNTFLAG",
                    16,
                    "1 if the timer counted to 0 since this register was last read",
                )?,
            ]),
        RegisterDescriptor::mmap("SYST_RVR", 0xE000_E014)
            .with_description("SysTick reload value register")
            .with_field(
                BitField::new("RELOAD", 0..24)?
                    .with_description("Value loaded into SYST_CVR when the counter reaches 0"),
            ),
        RegisterDescriptor::mmap("SYST_CVR", 0xE000_E018)
            .with_description("SysTick current value register")
            .with_field(BitField::new("CURRENT", 0..24)?),
        RegisterDescriptor::mmap("SYST_CALIB", 0xE000_E01C)
            .with_description("SysTick calibration value register")
            .with_fields([
                BitField::new("TENMS", 0..24)?
                    .with_description("Reload value for 10ms, 0 if unknown"),
                bit("SKEW", 30, "TENMS is inexact")?
                    .with_value(0, "TENMS value is exact")
                    .with_value(1, "TENMS value is inexact, or not given"),
                bit("NOREF", 31, "No reference clock")?
                    .with_value(0, "Reference clock provided")
                    .with_value(1, "No reference clock provided"),
            ]),
    ])
}

fn scb() -> Result<Vec<RegisterDescriptor>, CatalogError> {
    Ok(vec![
        RegisterDescriptor::mmap("CPUID", 0xE000_ED00)
            .with_description("CPUID base register")
            .with_fields([
                BitField::new("Revision", 0..4)?,
                BitField::new("PartNo", 4..16)?
                    .with_value(0xC23, "Cortex-M3")
                    .with_value(0xC24, "Cortex-M4")
                    .with_value(0xC27, "Cortex-M7"),
                BitField::new("Constant", 16..20)?,
                BitField::new("Variant", 20..24)?,
                BitField::new("Implementer", 24..32)?.with_value(0x41, "ARM"),
            ]),
        RegisterDescriptor::mmap("ICSR", 0xE000_ED04)
            .with_description("Interrupt control and state register")
            .with_fields([
                BitField::new("VECTACTIVE", 0..9)?.with_value(0, "Thread mode"),
                bit("RETTOBASE", 11, "No active exception other than the current one")?,
                BitField::new("VECTPENDING", 12..21)?.with_value(0, "No pending exception"),
                bit("ISRPENDING", 22, "External interrupt pending")?,
                bit("PENDSTCLR", 25, "Removes the pending state of SysTick")?,
                bit("PENDSTSET", 26, "SysTick pending")?,
                bit("PENDSVCLR", 27, "Removes the pending state of PendSV")?,
                bit("PENDSVSET", 28, "PendSV pending")?,
                bit("NMIPENDSET", 31, "NMI pending")?,
            ]),
        RegisterDescriptor::mmap("SCB_CCR", 0xE000_ED14)
            .with_description("Configuration and control register")
            .with_fields([
                bit("DC", 16, "Enables L1 data cache")?,
                bit("IC", 17, "Enables L1 instruction cache")?,
            ]),
    ])
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::catalog::Location;

    #[test]
    fn builds() {
        let catalog = catalog().unwrap();
        assert_eq!(catalog.get("R12").unwrap().location(), &Location::Core("r12".into()));
        assert_eq!(
            catalog.get("SYST_CSR").unwrap().location(),
            &Location::Address(0xE000_E010)
        );
        assert!(catalog.get("R13").is_none());
    }

    #[test]
    fn non_contiguous_it_bits() {
        let catalog = catalog().unwrap();
        let it = catalog.get("xPSR").unwrap().field("EPSR:ICI/IT").unwrap();
        assert_eq!(it.positions(), &[10, 11, 12, 13, 14, 15, 25, 26]);
        // bits 10, 25 and 26 set, plus the Thumb bit which is not part of the field
        assert_eq!(it.value(0x0700_0400), 0b1100_0001);
    }

    #[test]
    fn systick_description() {
        let catalog = catalog().unwrap();
        let csr = catalog.get("SYST_CSR").unwrap();
        assert_eq!(
            csr.field("ENABLE").unwrap().describe(0x7),
            "ENABLE = 0x1 = 0b1 = 1u (Counter enabled)"
        );
        assert_eq!(
            csr.field("CLKSOURCE").unwrap().describe(0x3),
            "CLKSOURCE = 0x0 = 0b0 = 0u (External clock)"
        );
    }

    #[test]
    fn cpuid() {
        let catalog = catalog().unwrap();
        let cpuid = catalog.get("CPUID").unwrap();
        assert_eq!(
            cpuid.field("PartNo").unwrap().describe(0x411F_C271),
            "PartNo = 0xC27 = 0b110000100111 = 3111u (Cortex-M7)"
        );
    }
}
