#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Fuzz a small and a wide P1 configuration.
    let _ = tta_asm::assemble(data, 3, 4);
    let _ = tta_asm::assemble(data, 4, 16);

    let mut asm = match tta_asm::Assembler::p1(4, 8) {
        Ok(asm) => asm,
        Err(_) => return,
    };
    asm.base_offset(0x100).augment("K", -7);
    if let Ok(result) = asm.assemble_str(data) {
        let _ = result.listing();
        let _ = tta_asm::output::sim_image(result.words());
    }
});
