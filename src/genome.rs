use std::fmt;

use rand::{Rng, RngCore};

use crate::blueprint::{VehicleBlueprint, WheelBlueprint};
use crate::config::VehicleSettings;
use crate::error::{GenomeError, OperatorError};
use crate::operators::{GeneticOperators, check_bits};

/// Bits per encoded value.
pub const GENE_BITS: usize = 8;
/// Attachment, radius, density, speed and torque.
pub const WHEEL_GENES: usize = 5;

/// Bit layout of a genome: every body point, the body density, then one
/// fixed-size section per wheel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GenomeLayout {
    pub num_body_points: usize,
    pub num_wheels: usize,
}

impl GenomeLayout {
    pub fn new(num_body_points: usize, num_wheels: usize) -> Self {
        Self {
            num_body_points,
            num_wheels,
        }
    }

    pub fn from_settings(settings: &VehicleSettings) -> Self {
        Self::new(settings.num_body_points, settings.num_wheels)
    }

    pub fn body_point_bits(&self) -> usize {
        self.num_body_points * GENE_BITS
    }

    pub fn body_section_bits(&self) -> usize {
        self.body_point_bits() + GENE_BITS
    }

    pub fn wheel_section_bits(&self) -> usize {
        WHEEL_GENES * GENE_BITS
    }

    pub fn len(&self) -> usize {
        self.body_section_bits() + self.num_wheels * self.wheel_section_bits()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn wheel_gene_offset(&self, wheel: usize, gene: usize) -> usize {
        self.body_section_bits() + wheel * self.wheel_section_bits() + gene * GENE_BITS
    }
}

/// Fixed-length bit string encoding one vehicle.
///
/// Treated as a value: operators produce new genomes rather than editing
/// one that has already been decoded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Genome {
    layout: GenomeLayout,
    bits: String,
}

impl Genome {
    /// All-zero genome, which decodes to every minimum.
    pub fn zeroed(layout: GenomeLayout) -> Self {
        Self {
            layout,
            bits: "0".repeat(layout.len()),
        }
    }

    pub fn random(layout: GenomeLayout, rng: &mut dyn RngCore) -> Self {
        let mut genome = Self::zeroed(layout);
        genome.randomize(rng);
        genome
    }

    pub fn from_bits(layout: GenomeLayout, bits: impl Into<String>) -> Result<Self, GenomeError> {
        let bits = bits.into();
        check_bits(&bits, layout.len())?;
        Ok(Self { layout, bits })
    }

    /// Sets each bit independently with probability 0.5.
    pub fn randomize(&mut self, rng: &mut dyn RngCore) {
        self.bits = (0..self.layout.len())
            .map(|_| if rng.random::<f64>() < 0.5 { '0' } else { '1' })
            .collect();
    }

    pub fn layout(&self) -> GenomeLayout {
        self.layout
    }

    pub fn as_str(&self) -> &str {
        &self.bits
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Decodes every gene into a [0, 1] fraction. Pure and total.
    pub fn decode(&self) -> VehicleBlueprint {
        let layout = self.layout;
        let body_points = (0..layout.num_body_points)
            .map(|i| self.byte_at(i * GENE_BITS) as f32 / 255.0)
            .collect();
        let body_density = self.byte_at(layout.body_point_bits()) as f32 / 255.0;
        let wheels = (0..layout.num_wheels)
            .map(|wheel| {
                // Divided by 256 so the fraction stays below one and the
                // vertex index below num_body_points.
                let attach = self.byte_at(layout.wheel_gene_offset(wheel, 0)) as f32 / 256.0;
                WheelBlueprint {
                    attachment: (attach * layout.num_body_points as f32) as usize,
                    radius: self.fraction(layout.wheel_gene_offset(wheel, 1)),
                    density: self.fraction(layout.wheel_gene_offset(wheel, 2)),
                    speed: self.fraction(layout.wheel_gene_offset(wheel, 3)),
                    torque: self.fraction(layout.wheel_gene_offset(wheel, 4)),
                }
            })
            .collect();
        VehicleBlueprint {
            body_points,
            body_density,
            wheels,
        }
    }

    pub fn mutated(
        &self,
        operators: &dyn GeneticOperators,
        rng: &mut dyn RngCore,
    ) -> Result<Genome, OperatorError> {
        let mut bits = self.bits.clone();
        operators.mutate(&mut bits, rng);
        Genome::from_bits(self.layout, bits).map_err(OperatorError::Mutation)
    }

    pub fn crossover(
        a: &Genome,
        b: &Genome,
        operators: &dyn GeneticOperators,
        rng: &mut dyn RngCore,
    ) -> Result<Genome, OperatorError> {
        let child = operators.crossover(&a.bits, &b.bits, rng);
        Genome::from_bits(a.layout, child).map_err(OperatorError::Crossover)
    }

    fn byte_at(&self, offset: usize) -> u8 {
        self.bits.as_bytes()[offset..offset + GENE_BITS]
            .iter()
            .fold(0u8, |acc, &bit| (acc << 1) | u8::from(bit == b'1'))
    }

    fn fraction(&self, offset: usize) -> f32 {
        self.byte_at(offset) as f32 / 255.0
    }
}

impl fmt::Display for Genome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operators::DefaultOperators;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn layout() -> GenomeLayout {
        GenomeLayout::new(8, 2)
    }

    #[test]
    fn layout_length() {
        // 8 points + density, then 2 wheels of 5 genes, 8 bits each.
        assert_eq!(layout().len(), 8 * 8 + 8 + 2 * 40);
    }

    #[test]
    fn zero_genome_decodes_to_minimums() {
        let settings = VehicleSettings::default();
        let blueprint = Genome::zeroed(layout()).decode();
        blueprint.validate(&settings).unwrap();
        for i in 0..settings.num_body_points {
            assert_eq!(
                blueprint.body_point_distance(i, &settings),
                settings.min_body_point_distance
            );
        }
        assert_eq!(
            blueprint.body_density_value(&settings),
            settings.min_body_density
        );
        for i in 0..settings.num_wheels {
            assert_eq!(blueprint.wheels[i].attachment, 0);
            assert_eq!(
                blueprint.wheel_radius(i, &settings),
                settings.min_wheel_radius
            );
            assert_eq!(
                blueprint.wheel_density(i, &settings),
                settings.min_wheel_density
            );
            assert_eq!(
                blueprint.wheel_speed(i, &settings),
                settings.min_wheel_speed
            );
            assert_eq!(
                blueprint.wheel_torque(i, &settings),
                settings.min_wheel_torque
            );
        }
    }

    #[test]
    fn all_ones_keeps_attachment_in_bounds() {
        let bits = "1".repeat(layout().len());
        let blueprint = Genome::from_bits(layout(), bits).unwrap().decode();
        assert!(blueprint.body_points.iter().all(|&p| p == 1.0));
        for wheel in &blueprint.wheels {
            assert_eq!(wheel.attachment, 7);
            assert_eq!(wheel.torque, 1.0);
        }
    }

    #[test]
    fn decode_is_pure_and_in_bounds() {
        let mut rng = SmallRng::seed_from_u64(42);
        let settings = VehicleSettings::default();
        for _ in 0..200 {
            let genome = Genome::random(layout(), &mut rng);
            let first = genome.decode();
            assert_eq!(first, genome.decode());
            first.validate(&settings).unwrap();
        }
    }

    #[test]
    fn genes_are_read_from_their_own_ranges() {
        let l = layout();
        let mut bits = "0".repeat(l.len()).into_bytes();
        // body density byte = 0b1000_0000
        bits[l.body_point_bits()] = b'1';
        // second wheel torque byte = 0b0000_0001
        let torque = l.wheel_gene_offset(1, 4) + GENE_BITS - 1;
        bits[torque] = b'1';
        let bits = String::from_utf8(bits).unwrap();
        let genome = Genome::from_bits(l, bits).unwrap();
        let blueprint = genome.decode();
        assert!((blueprint.body_density - 128.0 / 255.0).abs() < 1e-6);
        assert!((blueprint.wheels[1].torque - 1.0 / 255.0).abs() < 1e-6);
        assert_eq!(blueprint.wheels[0].torque, 0.0);
        assert!(blueprint.body_points.iter().all(|&p| p == 0.0));
    }

    #[test]
    fn randomize_is_reproducible_for_a_seed() {
        let a = Genome::random(layout(), &mut SmallRng::seed_from_u64(5));
        let b = Genome::random(layout(), &mut SmallRng::seed_from_u64(5));
        assert_eq!(a, b);
        check_bits(a.as_str(), layout().len()).unwrap();
    }

    #[test]
    fn operators_keep_length_and_alphabet() {
        let mut rng = SmallRng::seed_from_u64(9);
        for _ in 0..100 {
            let a = Genome::random(layout(), &mut rng);
            let b = Genome::random(layout(), &mut rng);
            let child = Genome::crossover(&a, &b, &DefaultOperators, &mut rng).unwrap();
            let mutant = child.mutated(&DefaultOperators, &mut rng).unwrap();
            assert_eq!(mutant.len(), a.len());
            assert!(mutant.as_str().bytes().all(|c| c == b'0' || c == b'1'));
        }
    }

    #[test]
    fn from_bits_rejects_bad_input() {
        assert!(Genome::from_bits(layout(), "0101").is_err());
        let mut bits = "0".repeat(layout().len());
        bits.replace_range(3..4, "a");
        assert_eq!(
            Genome::from_bits(layout(), bits),
            Err(GenomeError::NonBinary {
                position: 3,
                found: 'a',
            })
        );
    }
}
