// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The vector table.
//!
//! The CPU reads this table directly: word 0 at reset as the initial stack
//! pointer, word 1 at reset as the place to start executing, and word `n`
//! whenever exception `n` is taken. Vendor interrupt `irq` is exception
//! `16 + irq`. Nothing here is consulted at runtime by software; the layout
//! *is* the interface.
//!
//! # Claiming a slot
//!
//! Applications implement [`Handlers`] on a type of their own, overriding the
//! associated constant for each slot they care about, and hand that type to
//! [`vector_table!`](crate::vector_table!). Every constant they leave alone
//! keeps its default, which is [`DefaultHandler`] for faults and interrupts
//! and [`NoOpHandler`] for SVCall, PendSV and SysTick. Since the table is a
//! `const` evaluated at compile time, claiming a slot costs nothing on
//! interrupt entry.
//!
//! Reset, NMI and HardFault are not items of [`Handlers`]; the runtime owns
//! those.

use static_assertions::{const_assert, const_assert_eq};

use crate::consts::VECTOR_COUNT;
use crate::handlers::{
    DefaultHandler, HardFault, NoOpHandler, NonMaskableInt,
};
use crate::startup::Reset;

/// Exceptions defined by the architecture, ahead of the first vendor
/// interrupt.
pub const IRQ_BASE: usize = 16;

/// Vendor interrupt numbers, reserved ones included.
pub const IRQ_COUNT: usize = 139;

const_assert_eq!(IRQ_BASE + IRQ_COUNT, VECTOR_COUNT);

pub type Handler = unsafe extern "C" fn();
pub type DivergingHandler = unsafe extern "C" fn() -> !;

/// One word of the vector table.
#[derive(Copy, Clone)]
#[repr(C)]
pub union Vector {
    handler: Handler,
    diverging: DivergingHandler,
    word: usize,
}

const_assert_eq!(core::mem::size_of::<Vector>(), core::mem::size_of::<usize>());

pub type VectorTable = [Vector; VECTOR_COUNT];

impl Vector {
    /// What goes in slots the hardware will never use.
    pub const RESERVED: Self = Self { word: 0 };

    pub const fn stack_top(addr: usize) -> Self {
        Self { word: addr }
    }

    pub const fn handler(h: Handler) -> Self {
        Self { handler: h }
    }

    pub const fn diverging(h: DivergingHandler) -> Self {
        Self { diverging: h }
    }

    /// The raw word the hardware will see.
    pub fn address(&self) -> usize {
        // Safety: every variant is exactly one word wide, and any bit
        // pattern is a valid usize.
        unsafe { self.word }
    }
}

impl core::fmt::Debug for Vector {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Vector({:#010x})", self.address())
    }
}

/// Architecturally defined exceptions, numbered as in the table.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[repr(u8)]
pub enum Exception {
    Reset = 1,
    NonMaskableInt = 2,
    HardFault = 3,
    MemoryManagement = 4,
    BusFault = 5,
    UsageFault = 6,
    // 7-10 reserved
    SVCall = 11,
    DebugMonitor = 12,
    // 13 reserved
    PendSV = 14,
    SysTick = 15,
}

impl Exception {
    pub const ALL: &'static [Self] = &[
        Self::Reset,
        Self::NonMaskableInt,
        Self::HardFault,
        Self::MemoryManagement,
        Self::BusFault,
        Self::UsageFault,
        Self::SVCall,
        Self::DebugMonitor,
        Self::PendSV,
        Self::SysTick,
    ];

    pub const fn from_number(n: usize) -> Option<Self> {
        match n {
            1 => Some(Self::Reset),
            2 => Some(Self::NonMaskableInt),
            3 => Some(Self::HardFault),
            4 => Some(Self::MemoryManagement),
            5 => Some(Self::BusFault),
            6 => Some(Self::UsageFault),
            11 => Some(Self::SVCall),
            12 => Some(Self::DebugMonitor),
            14 => Some(Self::PendSV),
            15 => Some(Self::SysTick),
            _ => None,
        }
    }

    /// Whether an application can supply its own handler for this.
    pub const fn is_overridable(self) -> bool {
        !matches!(self, Self::Reset | Self::NonMaskableInt | Self::HardFault)
    }
}

const_assert!((Exception::SysTick as usize) < IRQ_BASE);

pub const fn vector_index(e: Exception) -> usize {
    e as usize
}

pub const fn irq_vector_index(i: Interrupt) -> usize {
    IRQ_BASE + i as usize
}

/// Checks whether table slot `index` is one the hardware never uses. Slot 0
/// (the stack pointer) is not reserved, and neither is anything past the end
/// of the table, since there is no such slot.
pub const fn is_reserved(index: usize) -> bool {
    if index == 0 || index >= VECTOR_COUNT {
        false
    } else if index < IRQ_BASE {
        Exception::from_number(index).is_none()
    } else {
        Interrupt::from_irq((index - IRQ_BASE) as u16).is_none()
    }
}

/// Generates [`Interrupt`], the [`Handlers`] trait and the table builder from
/// a single interrupt map, so that the three can't disagree.
macro_rules! interrupt_map {
    ($(
        $(#[doc = $doc:literal])*
        $name:ident = $irq:literal => $slot:ident,
    )*) => {
        /// TM4C123 vendor interrupts, by IRQ number.
        #[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
        #[repr(u16)]
        pub enum Interrupt {
            $(
                $(#[doc = $doc])*
                $name = $irq,
            )*
        }

        impl Interrupt {
            pub const ALL: &'static [Self] = &[$(Self::$name,)*];

            /// Looks up an IRQ number, returning `None` for the reserved
            /// ones.
            pub const fn from_irq(irq: u16) -> Option<Self> {
                match irq {
                    $($irq => Some(Self::$name),)*
                    _ => None,
                }
            }

            pub const fn irq(self) -> u16 {
                self as u16
            }
        }

        $(const_assert!(($irq as usize) < IRQ_COUNT);)*

        /// Handler bindings for every slot an application may claim.
        ///
        /// Override only the constants you need:
        ///
        /// ```ignore
        /// impl Handlers for Board {
        ///     const SYS_TICK: Vector = Vector::handler(tick);
        ///     const UART0: Vector = Vector::handler(uart0_isr);
        /// }
        /// ```
        pub trait Handlers {
            const MEMORY_MANAGEMENT: Vector = Vector::diverging(DefaultHandler);
            const BUS_FAULT: Vector = Vector::diverging(DefaultHandler);
            const USAGE_FAULT: Vector = Vector::diverging(DefaultHandler);
            const SV_CALL: Vector = Vector::handler(NoOpHandler);
            const DEBUG_MONITOR: Vector = Vector::diverging(DefaultHandler);
            const PEND_SV: Vector = Vector::handler(NoOpHandler);
            const SYS_TICK: Vector = Vector::handler(NoOpHandler);
            $(
                $(#[doc = $doc])*
                const $slot: Vector = Vector::diverging(DefaultHandler);
            )*
        }

        /// Builds the table for `H`, with `stack_top` in word 0.
        pub const fn vector_table<H: Handlers + ?Sized>(
            stack_top: usize,
        ) -> VectorTable {
            let mut t = [Vector::RESERVED; VECTOR_COUNT];
            t[0] = Vector::stack_top(stack_top);

            t[Exception::Reset as usize] = Vector::diverging(Reset);
            t[Exception::NonMaskableInt as usize] =
                Vector::diverging(NonMaskableInt);
            t[Exception::HardFault as usize] = Vector::diverging(HardFault);
            t[Exception::MemoryManagement as usize] = H::MEMORY_MANAGEMENT;
            t[Exception::BusFault as usize] = H::BUS_FAULT;
            t[Exception::UsageFault as usize] = H::USAGE_FAULT;
            t[Exception::SVCall as usize] = H::SV_CALL;
            t[Exception::DebugMonitor as usize] = H::DEBUG_MONITOR;
            t[Exception::PendSV as usize] = H::PEND_SV;
            t[Exception::SysTick as usize] = H::SYS_TICK;

            $(t[IRQ_BASE + $irq] = H::$slot;)*
            t
        }
    };
}

interrupt_map! {
    GpioPortA = 0 => GPIO_PORT_A,
    GpioPortB = 1 => GPIO_PORT_B,
    GpioPortC = 2 => GPIO_PORT_C,
    GpioPortD = 3 => GPIO_PORT_D,
    GpioPortE = 4 => GPIO_PORT_E,
    Uart0 = 5 => UART0,
    Uart1 = 6 => UART1,
    /// SSI0, which is SPI-capable.
    Ssi0 = 7 => SSI0,
    I2c0 = 8 => I2C0,
    Pwm0Fault = 9 => PWM0_FAULT,
    Pwm0Generator0 = 10 => PWM0_GENERATOR0,
    Pwm0Generator1 = 11 => PWM0_GENERATOR1,
    Pwm0Generator2 = 12 => PWM0_GENERATOR2,
    Qei0 = 13 => QEI0,
    Adc0Sequence0 = 14 => ADC0_SEQUENCE0,
    Adc0Sequence1 = 15 => ADC0_SEQUENCE1,
    Adc0Sequence2 = 16 => ADC0_SEQUENCE2,
    Adc0Sequence3 = 17 => ADC0_SEQUENCE3,
    WatchdogTimer = 18 => WATCHDOG_TIMER,
    Timer0A = 19 => TIMER0A,
    Timer0B = 20 => TIMER0B,
    Timer1A = 21 => TIMER1A,
    Timer1B = 22 => TIMER1B,
    Timer2A = 23 => TIMER2A,
    Timer2B = 24 => TIMER2B,
    AnalogComparator0 = 25 => ANALOG_COMPARATOR0,
    AnalogComparator1 = 26 => ANALOG_COMPARATOR1,
    SystemCtrl = 28 => SYSTEM_CTRL,
    /// Flash memory control and EEPROM control.
    FlashCtrl = 29 => FLASH_CTRL,
    GpioPortF = 30 => GPIO_PORT_F,
    Uart2 = 33 => UART2,
    Ssi1 = 34 => SSI1,
    Timer3A = 35 => TIMER3A,
    Timer3B = 36 => TIMER3B,
    I2c1 = 37 => I2C1,
    Qei1 = 38 => QEI1,
    Can0 = 39 => CAN0,
    Can1 = 40 => CAN1,
    Hibernation = 43 => HIBERNATION,
    Usb0 = 44 => USB0,
    Pwm0Generator3 = 45 => PWM0_GENERATOR3,
    UdmaSoftware = 46 => UDMA_SOFTWARE,
    UdmaError = 47 => UDMA_ERROR,
    Adc1Sequence0 = 48 => ADC1_SEQUENCE0,
    Adc1Sequence1 = 49 => ADC1_SEQUENCE1,
    Adc1Sequence2 = 50 => ADC1_SEQUENCE2,
    Adc1Sequence3 = 51 => ADC1_SEQUENCE3,
    Ssi2 = 57 => SSI2,
    Ssi3 = 58 => SSI3,
    Uart3 = 59 => UART3,
    Uart4 = 60 => UART4,
    Uart5 = 61 => UART5,
    Uart6 = 62 => UART6,
    Uart7 = 63 => UART7,
    I2c2 = 68 => I2C2,
    I2c3 = 69 => I2C3,
    Timer4A = 70 => TIMER4A,
    Timer4B = 71 => TIMER4B,
    Timer5A = 92 => TIMER5A,
    Timer5B = 93 => TIMER5B,
    WideTimer0A = 94 => WIDE_TIMER0A,
    WideTimer0B = 95 => WIDE_TIMER0B,
    WideTimer1A = 96 => WIDE_TIMER1A,
    WideTimer1B = 97 => WIDE_TIMER1B,
    WideTimer2A = 98 => WIDE_TIMER2A,
    WideTimer2B = 99 => WIDE_TIMER2B,
    WideTimer3A = 100 => WIDE_TIMER3A,
    WideTimer3B = 101 => WIDE_TIMER3B,
    WideTimer4A = 102 => WIDE_TIMER4A,
    WideTimer4B = 103 => WIDE_TIMER4B,
    WideTimer5A = 104 => WIDE_TIMER5A,
    WideTimer5B = 105 => WIDE_TIMER5B,
    /// Imprecise floating-point exceptions.
    SystemException = 106 => SYSTEM_EXCEPTION,
    Pwm1Generator0 = 134 => PWM1_GENERATOR0,
    Pwm1Generator1 = 135 => PWM1_GENERATOR1,
    Pwm1Generator2 = 136 => PWM1_GENERATOR2,
    Pwm1Generator3 = 137 => PWM1_GENERATOR3,
    Pwm1Fault = 138 => PWM1_FAULT,
}

/// Places the vector table for `$handlers` where the CPU will find it.
///
/// Exactly one image crate invokes this, once.
#[macro_export]
macro_rules! vector_table {
    ($handlers:ty) => {
        #[cfg_attr(target_os = "none", link_section = ".vector_table")]
        #[no_mangle]
        #[used]
        pub static __VECTOR_TABLE: $crate::VectorTable =
            $crate::vector_table::<$handlers>(
                $crate::consts::INITIAL_STACK_TOP,
            );
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOP: usize = 0x2000_8000;

    struct Stock;
    impl Handlers for Stock {}

    extern "C" fn uart0_isr() {}
    extern "C" fn tick() {}

    struct Claims;
    impl Handlers for Claims {
        const UART0: Vector = Vector::handler(uart0_isr);
        const SYS_TICK: Vector = Vector::handler(tick);
    }

    static STOCK: VectorTable = vector_table::<Stock>(TOP);
    static CLAIMS: VectorTable = vector_table::<Claims>(TOP);

    fn default_addr() -> usize {
        DefaultHandler as usize
    }

    #[test]
    fn geometry() {
        assert_eq!(STOCK.len(), 155);
        assert_eq!(Interrupt::ALL.len(), 78);
        assert_eq!(
            core::mem::size_of::<VectorTable>(),
            VECTOR_COUNT * core::mem::size_of::<usize>()
        );
    }

    #[test]
    fn stack_top_then_runtime_slots() {
        assert_eq!(STOCK[0].address(), TOP);
        assert_eq!(STOCK[1].address(), Reset as usize);
        assert_eq!(STOCK[2].address(), NonMaskableInt as usize);
        assert_eq!(STOCK[3].address(), HardFault as usize);
    }

    #[test]
    fn reserved_slots_are_null() {
        let reserved: Vec<usize> =
            (0..VECTOR_COUNT).filter(|&i| is_reserved(i)).collect();
        assert_eq!(reserved.len(), 66);
        assert_eq!(&reserved[..6], &[7, 8, 9, 10, 13, IRQ_BASE + 27]);
        for i in reserved {
            assert_eq!(STOCK[i].address(), 0, "slot {i}");
            assert_eq!(CLAIMS[i].address(), 0, "slot {i}");
        }
    }

    #[test]
    fn unclaimed_slots_resolve_to_default() {
        for e in [
            Exception::MemoryManagement,
            Exception::BusFault,
            Exception::UsageFault,
            Exception::DebugMonitor,
        ] {
            assert_eq!(STOCK[vector_index(e)].address(), default_addr());
        }
        for &i in Interrupt::ALL {
            assert_eq!(
                STOCK[irq_vector_index(i)].address(),
                default_addr(),
                "{i:?}"
            );
        }
    }

    #[test]
    fn scheduler_hooks_default_to_no_op() {
        for e in [Exception::SVCall, Exception::PendSV, Exception::SysTick] {
            assert_eq!(STOCK[vector_index(e)].address(), NoOpHandler as usize);
        }
    }

    #[test]
    fn override_touches_only_its_slot() {
        let uart0 = irq_vector_index(Interrupt::Uart0);
        let systick = vector_index(Exception::SysTick);
        assert_eq!(uart0, 21);
        assert_eq!(CLAIMS[uart0].address(), uart0_isr as usize);
        assert_eq!(CLAIMS[systick].address(), tick as usize);

        for i in 0..VECTOR_COUNT {
            if i != uart0 && i != systick {
                assert_eq!(
                    CLAIMS[i].address(),
                    STOCK[i].address(),
                    "slot {i}"
                );
            }
        }
    }

    #[test]
    fn irq_lookup() {
        assert_eq!(Interrupt::from_irq(0), Some(Interrupt::GpioPortA));
        assert_eq!(Interrupt::from_irq(30), Some(Interrupt::GpioPortF));
        assert_eq!(Interrupt::from_irq(138), Some(Interrupt::Pwm1Fault));
        assert_eq!(Interrupt::from_irq(27), None);
        assert_eq!(Interrupt::from_irq(107), None);
        assert_eq!(Interrupt::from_irq(139), None);
        for &i in Interrupt::ALL {
            assert_eq!(Interrupt::from_irq(i.irq()), Some(i));
        }
    }

    #[test]
    fn exception_numbers() {
        assert_eq!(Exception::from_number(0), None);
        assert_eq!(Exception::from_number(13), None);
        assert_eq!(Exception::from_number(16), None);
        for &e in Exception::ALL {
            assert_eq!(Exception::from_number(vector_index(e)), Some(e));
        }
        let fixed: Vec<_> = Exception::ALL
            .iter()
            .filter(|e| !e.is_overridable())
            .collect();
        assert_eq!(
            fixed,
            [&Exception::Reset, &Exception::NonMaskableInt, &Exception::HardFault]
        );
    }

    #[test]
    fn out_of_range_is_not_reserved() {
        assert!(!is_reserved(0));
        assert!(!is_reserved(VECTOR_COUNT));
        assert!(is_reserved(VECTOR_COUNT - 1 - 5));
        assert!(!is_reserved(VECTOR_COUNT - 1));
    }

    mod placed {
        use super::Stock;
        use crate::startup::Reset;
        use crate::vectors::Vector;

        crate::vector_table!(Stock);

        #[test]
        fn stack_top_comes_from_board_config() {
            assert_eq!(
                __VECTOR_TABLE[0].address(),
                crate::consts::INITIAL_STACK_TOP
            );
            assert_eq!(__VECTOR_TABLE[1].address(), Reset as usize);
        }

        #[test]
        fn placed_table_is_full_length() {
            assert_eq!(__VECTOR_TABLE.len(), crate::consts::VECTOR_COUNT);
            assert!(super::is_reserved(7));
            assert_eq!(__VECTOR_TABLE[7].address(), Vector::RESERVED.address());
        }
    }
}
