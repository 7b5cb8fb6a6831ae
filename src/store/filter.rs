//! Search predicate over laptops.

use crate::proto::memory::Unit;
use crate::proto::{Filter, Laptop, Memory};

/// Converts a memory amount to bits. Unknown units count as zero and
/// overflow saturates.
pub fn to_bits(memory: &Memory) -> u64 {
    let shift = match Unit::try_from(memory.unit).unwrap_or(Unit::Unknown) {
        Unit::Unknown => return 0,
        Unit::Bit => 0,
        Unit::Byte => 3,
        Unit::Kilobyte => 13,
        Unit::Megabyte => 23,
        Unit::Gigabyte => 33,
        Unit::Terabyte => 43,
    };

    memory.value.saturating_mul(1u64 << shift)
}

/// Whether `laptop` satisfies every bound in `filter`.
///
/// Price is an upper bound; core count, base clock and RAM are lower
/// bounds. Missing CPU or RAM on the laptop counts as zero.
pub fn matches(laptop: &Laptop, filter: &Filter) -> bool {
    if laptop.price_usd > filter.max_price_usd {
        return false;
    }

    let (cores, ghz) = laptop
        .cpu
        .as_ref()
        .map(|cpu| (cpu.number_cores, cpu.min_ghz))
        .unwrap_or_default();

    if cores < filter.min_cpu_cores || ghz < filter.min_cpu_ghz {
        return false;
    }

    let ram = laptop.ram.as_ref().map(to_bits).unwrap_or(0);
    let min_ram = filter.min_ram.as_ref().map(to_bits).unwrap_or(0);

    ram >= min_ram
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::Cpu;

    fn memory(value: u64, unit: Unit) -> Memory {
        Memory {
            value,
            unit: unit as i32,
        }
    }

    fn laptop(price: f64, cores: u32, ghz: f64, ram: Memory) -> Laptop {
        Laptop {
            price_usd: price,
            cpu: Some(Cpu {
                number_cores: cores,
                min_ghz: ghz,
                ..Default::default()
            }),
            ram: Some(ram),
            ..Default::default()
        }
    }

    #[test]
    fn unit_conversion() {
        assert_eq!(to_bits(&memory(1, Unit::Byte)), 8);
        assert_eq!(to_bits(&memory(1, Unit::Kilobyte)), 8 * 1024);
        assert_eq!(to_bits(&memory(8, Unit::Gigabyte)), to_bits(&memory(8192, Unit::Megabyte)));
        assert_eq!(to_bits(&memory(1, Unit::Terabyte)), to_bits(&memory(1024, Unit::Gigabyte)));
        assert_eq!(to_bits(&memory(42, Unit::Unknown)), 0);
        assert_eq!(to_bits(&memory(u64::MAX, Unit::Terabyte)), u64::MAX);
    }

    #[test]
    fn each_bound_is_enforced() {
        let filter = Filter {
            max_price_usd: 3000.0,
            min_cpu_cores: 4,
            min_cpu_ghz: 2.5,
            min_ram: Some(memory(8, Unit::Gigabyte)),
        };

        assert!(matches(&laptop(2999.0, 4, 2.5, memory(8, Unit::Gigabyte)), &filter));
        assert!(matches(&laptop(3000.0, 8, 3.0, memory(16384, Unit::Megabyte)), &filter));

        assert!(!matches(&laptop(3001.0, 8, 3.0, memory(16, Unit::Gigabyte)), &filter));
        assert!(!matches(&laptop(1000.0, 2, 3.0, memory(16, Unit::Gigabyte)), &filter));
        assert!(!matches(&laptop(1000.0, 8, 2.4, memory(16, Unit::Gigabyte)), &filter));
        assert!(!matches(&laptop(1000.0, 8, 3.0, memory(4096, Unit::Megabyte)), &filter));
    }

    #[test]
    fn missing_min_ram_means_no_ram_bound() {
        let filter = Filter {
            max_price_usd: 1000.0,
            ..Default::default()
        };

        let mut bare = laptop(500.0, 1, 1.0, memory(0, Unit::Unknown));
        bare.ram = None;
        assert!(matches(&bare, &filter));
    }
}
