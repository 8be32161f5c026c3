//! Derive a keystream from a password and XOR it over a message.
//!
//! Run with: `cargo run --example keystream`

use bitforge::{derive_seed, keystream_with, GeneratorKind, Settings};

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let message = b"attack at dawn";
    let seed = derive_seed(b"correct horse", b"battery staple");
    let settings = Settings::default().with_bbs_prime_bits(64);

    for kind in [GeneratorKind::Quadratic, GeneratorKind::Bbs, GeneratorKind::Yarrow160] {
        let stream = keystream_with(message.len(), kind, &seed, &settings)?;
        let ciphertext: Vec<u8> = message.iter().zip(&stream).map(|(m, k)| m ^ k).collect();

        // Same password and key material give the same keystream
        let again = keystream_with(message.len(), kind, &seed, &settings)?;
        let recovered: Vec<u8> = ciphertext.iter().zip(&again).map(|(c, k)| c ^ k).collect();

        println!("{:?}", kind);
        println!("  keystream:  {}", hex(&stream));
        println!("  ciphertext: {}", hex(&ciphertext));
        println!("  recovered:  {}", String::from_utf8_lossy(&recovered));
    }

    Ok(())
}
