//! The runtime support for the BCM2837.
//!
//! The GPU firmware loads `kernel8.img` at `0x80000` and starts all four cores there. Core 0 gets
//! a stack just below the image, zeroes `.bss` and calls `kmain`, which must never return. The
//! other cores park in `wfe`.

use core::arch::global_asm;

global_asm!(
    r#"
.section .text.boot, "ax"
.global _start
_start:
    mrs     x1, mpidr_el1
    and     x1, x1, #3
    cbz     x1, 2f
1:
    wfe
    b       1b
2:
    adrp    x1, __stack_top
    add     x1, x1, :lo12:__stack_top
    mov     sp, x1

    adrp    x1, __bss_start
    add     x1, x1, :lo12:__bss_start
    adrp    x2, __bss_end
    add     x2, x2, :lo12:__bss_end
3:
    cmp     x1, x2
    b.hs    4f
    str     xzr, [x1], #8
    b       3b
4:
    bl      kmain
    b       1b
"#
);

/// Interrupts are never unmasked and only core 0 runs, so there is nothing to exclude.
struct SingleCoreCriticalSection;
critical_section::set_impl!(SingleCoreCriticalSection);

unsafe impl critical_section::Impl for SingleCoreCriticalSection {
    unsafe fn acquire() -> critical_section::RawRestoreState {}

    unsafe fn release(_restore_state: critical_section::RawRestoreState) {}
}
