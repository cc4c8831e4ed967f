use crate::audio::constants::MAX_BLOCK_SIZE;
use crate::audio::ring_buffer::Producer;

/// Collects the mono mix on the audio thread and hands fixed-size blocks to
/// the display thread.
pub struct SampleBufferEngine {
    producer: Producer<Vec<f32>>,

    // Block being filled (audio thread only)
    temp_buffer: Vec<f32>,
    write_position: usize,

    // Blocks refused by a full queue
    dropped_blocks: u64,
}

impl SampleBufferEngine {
    /// `block_size` is clamped to `1..=MAX_BLOCK_SIZE`
    pub fn new(producer: Producer<Vec<f32>>, block_size: usize) -> Self {
        Self {
            producer,
            temp_buffer: vec![0.0; block_size.clamp(1, MAX_BLOCK_SIZE)],
            write_position: 0,
            dropped_blocks: 0,
        }
    }

    pub fn block_size(&self) -> usize {
        self.temp_buffer.len()
    }

    // Called from audio thread - NO ALLOCATIONS!
    pub fn write_sample(&mut self, sample: f32) {
        self.temp_buffer[self.write_position] = sample;
        self.write_position += 1;
        if self.write_position >= self.temp_buffer.len() {
            // Block is full, send it to the display thread
            if !self.producer.push(&self.temp_buffer) {
                self.dropped_blocks += 1;
            }
            self.write_position = 0;
        }
    }

    pub fn write_samples(&mut self, samples: &[f32]) {
        for &sample in samples {
            self.write_sample(sample);
        }
    }

    pub fn dropped_blocks(&self) -> u64 {
        self.dropped_blocks
    }

    /// Forget the partially filled block
    pub fn reset(&mut self) {
        self.write_position = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::ring_buffer::LockFreeRingBuffer;

    #[test]
    fn pushes_only_complete_blocks() {
        let (producer, mut consumer) = LockFreeRingBuffer::new(4, &vec![0.0f32; 4]).split();
        let mut engine = SampleBufferEngine::new(producer, 4);

        engine.write_samples(&[1.0, 2.0, 3.0]);
        assert!(consumer.is_empty());

        engine.write_samples(&[4.0, 5.0]);
        let mut block = vec![0.0; 4];
        assert!(consumer.pop(&mut block));
        assert_eq!(block, vec![1.0, 2.0, 3.0, 4.0]);
        assert!(consumer.is_empty());
    }

    #[test]
    fn counts_blocks_dropped_on_overflow() {
        let (producer, consumer) = LockFreeRingBuffer::new(2, &vec![0.0f32; 2]).split();
        let mut engine = SampleBufferEngine::new(producer, 2);

        engine.write_samples(&[0.1; 10]);
        assert_eq!(consumer.len(), 2);
        assert_eq!(engine.dropped_blocks(), 3);
    }

    #[test]
    fn reset_discards_partial_block() {
        let (producer, mut consumer) = LockFreeRingBuffer::new(2, &vec![0.0f32; 3]).split();
        let mut engine = SampleBufferEngine::new(producer, 3);

        engine.write_samples(&[9.0, 9.0]);
        engine.reset();
        engine.write_samples(&[1.0, 2.0, 3.0]);

        let mut block = vec![0.0; 3];
        assert!(consumer.pop(&mut block));
        assert_eq!(block, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn block_size_is_bounded() {
        let (producer, _consumer) = LockFreeRingBuffer::new(1, &Vec::new()).split();
        let engine = SampleBufferEngine::new(producer, 1 << 20);
        assert_eq!(engine.block_size(), MAX_BLOCK_SIZE);
    }
}
