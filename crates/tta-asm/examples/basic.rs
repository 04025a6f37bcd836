//! Basic assembly example: demonstrates the one-shot and builder APIs.
//!
//! Run with: `cargo run --example basic`

use tta_asm::output::sim_image;
use tta_asm::{assemble, Assembler, Format, Summary};

fn main() {
    println!("=== tta_asm basic example ===\n");

    // --- One-shot assembly ---
    println!("1. One-shot assembly (var1 = 1; acc += var1):");
    let result = assemble("var1 = 1\nacc += var1", 4, 8).unwrap();
    print_words("   ", result.words());

    // --- Builder API ---
    println!("\n2. Builder API (countdown setup with a forward label):");
    let mut asm = Assembler::p1(4, 8).unwrap();
    asm.augment("COUNT", 10);
    let result = asm
        .assemble_str(
            r#"
// var1 holds one for every constant load
var1 = 1
var2 := &COUNT      // loop counter
addr =-= .done      // forward target, fixed length
{
    acc += var2
    var3 = acc
}
@.done
"#,
        )
        .unwrap();
    print_words("   ", result.words());

    println!("\n   Labels:");
    for (name, offset) in result.labels() {
        println!("   {}: 0x{:X}", name, offset);
    }

    // --- Output formats ---
    println!("\n3. Listing:");
    print!("{}", Format::Listing.render(&result));

    println!("\n4. Logisim image:");
    println!("{}", sim_image(result.words()));

    println!("\n5. Summary:");
    println!("{}", Summary::new(&result, asm.architecture()));
}

fn print_words(prefix: &str, words: &[u64]) {
    let hex: Vec<String> = words.iter().map(|w| format!("{:02X}", w)).collect();
    println!("{}{}", prefix, hex.join(" "));
}
