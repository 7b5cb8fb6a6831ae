//! Random laptops and scores for the demo client, tests and benchmarks.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::proto::laptop::Weight;
use crate::proto::memory::Unit;
use crate::proto::screen::{Panel, Resolution};
use crate::proto::storage::Driver;
use crate::proto::{Cpu, Filter, Gpu, Laptop, Memory, Screen, Storage};

fn pick<'a, R: Rng + ?Sized>(rng: &mut R, items: &[&'a str]) -> &'a str {
    items.choose(rng).copied().unwrap_or_default()
}

fn memory(value: u64, unit: Unit) -> Memory {
    Memory {
        value,
        unit: unit as i32,
    }
}

/// A random laptop without an id, so the server assigns one.
pub fn new_laptop() -> Laptop {
    new_laptop_with(&mut rand::thread_rng())
}

/// Like [`new_laptop`], drawing from `rng`.
pub fn new_laptop_with<R: Rng + ?Sized>(rng: &mut R) -> Laptop {
    let brand = pick(rng, &["Apple", "Dell", "Lenovo"]);
    let name = match brand {
        "Apple" => pick(rng, &["Macbook Air", "Macbook Pro"]),
        "Dell" => pick(rng, &["Latitude", "Vostro", "XPS", "Alienware"]),
        _ => pick(rng, &["Thinkpad X1", "Thinkpad P1", "Thinkpad P53"]),
    };

    Laptop {
        id: String::new(),
        brand: brand.to_string(),
        name: name.to_string(),
        cpu: Some(new_cpu(rng)),
        ram: Some(memory(rng.gen_range(4..=64), Unit::Gigabyte)),
        gpus: vec![new_gpu(rng)],
        storages: vec![
            Storage {
                driver: Driver::Ssd as i32,
                memory: Some(memory(rng.gen_range(128..=1024), Unit::Gigabyte)),
            },
            Storage {
                driver: Driver::Hdd as i32,
                memory: Some(memory(rng.gen_range(1..=6), Unit::Terabyte)),
            },
        ],
        screen: Some(new_screen(rng)),
        price_usd: rng.gen_range(1500.0..3500.0),
        release_year: rng.gen_range(2015..=2019),
        weight: Some(Weight::WeightKg(rng.gen_range(1.0..3.0))),
    }
}

fn new_cpu<R: Rng + ?Sized>(rng: &mut R) -> Cpu {
    let brand = pick(rng, &["Intel", "AMD"]);
    let name = if brand == "Intel" {
        pick(
            rng,
            &[
                "Xeon E-2286M",
                "Core i9-9980HK",
                "Core i7-9750H",
                "Core i5-9400F",
                "Core i3-1005G1",
            ],
        )
    } else {
        pick(
            rng,
            &[
                "Ryzen 7 PRO 2700U",
                "Ryzen 5 PRO 3500U",
                "Ryzen 3 PRO 3200GE",
            ],
        )
    };

    let number_cores = rng.gen_range(2..=8);
    let min_ghz = rng.gen_range(2.0..3.5);

    Cpu {
        brand: brand.to_string(),
        name: name.to_string(),
        number_cores,
        number_threads: rng.gen_range(number_cores..=12),
        min_ghz,
        max_ghz: rng.gen_range(min_ghz..5.0),
    }
}

fn new_gpu<R: Rng + ?Sized>(rng: &mut R) -> Gpu {
    let brand = pick(rng, &["Nvidia", "AMD"]);
    let name = if brand == "Nvidia" {
        pick(rng, &["RTX 2060", "RTX 2070", "GTX 1660-Ti", "GTX 1070"])
    } else {
        pick(rng, &["RX 590", "RX 580", "RX 5700-XT", "RX Vega-56"])
    };

    let min_ghz = rng.gen_range(1.0..1.5);

    Gpu {
        brand: brand.to_string(),
        name: name.to_string(),
        min_ghz,
        max_ghz: rng.gen_range(min_ghz..2.0),
        memory: Some(memory(rng.gen_range(2..=6), Unit::Gigabyte)),
    }
}

fn new_screen<R: Rng + ?Sized>(rng: &mut R) -> Screen {
    let height = rng.gen_range(1080..=4320);

    Screen {
        size_inch: rng.gen_range(13.0..17.0),
        resolution: Some(Resolution {
            width: height * 16 / 9,
            height,
        }),
        panel: *[Panel::Ips, Panel::Oled].choose(rng).unwrap_or(&Panel::Ips) as i32,
        multitouch: rng.gen_bool(0.5),
    }
}

/// A random whole score from 1 to 10.
pub fn random_laptop_score() -> f64 {
    f64::from(rand::thread_rng().gen_range(1..=10u8))
}

/// The filter used by the demo search: at most $3000, 4+ cores at 2.5GHz+
/// and 8GB+ RAM.
pub fn demo_filter() -> Filter {
    Filter {
        max_price_usd: 3000.0,
        min_cpu_cores: 4,
        min_cpu_ghz: 2.5,
        min_ram: Some(memory(8, Unit::Gigabyte)),
    }
}
