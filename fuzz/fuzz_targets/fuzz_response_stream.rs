//! Feed arbitrary bytes to the driver as if they came off the line.
//!
//! The first byte picks how the stream is split into reads; the driver must
//! never panic and must always end up in a valid state.

#![no_main]

use std::collections::VecDeque;

use libfuzzer_sys::fuzz_target;

use aurora_modbus::frame::RxBuffer;
use aurora_modbus::{AuroraDriver, AuroraTransport, DriverConfig, ModbusResult};

/// Hands out the script a few chunks per request, so replies land after the
/// driver has cleared stale input.
struct ScriptedTransport {
    script: VecDeque<Vec<u8>>,
    chunks: VecDeque<Vec<u8>>,
    per_request: usize,
    clock_ms: u64,
}

impl AuroraTransport for ScriptedTransport {
    fn read_available(&mut self, buf: &mut [u8]) -> ModbusResult<usize> {
        let Some(mut chunk) = self.chunks.pop_front() else {
            return Ok(0);
        };
        let n = chunk.len().min(buf.len());
        buf[..n].copy_from_slice(&chunk[..n]);
        if n < chunk.len() {
            self.chunks.push_front(chunk.split_off(n));
        }
        Ok(n)
    }

    fn write_all(&mut self, _data: &[u8]) -> ModbusResult<()> {
        for _ in 0..self.per_request {
            match self.script.pop_front() {
                Some(chunk) => self.chunks.push_back(chunk),
                None => break,
            }
        }
        Ok(())
    }

    fn flush(&mut self) -> ModbusResult<()> {
        Ok(())
    }

    fn now_ms(&self) -> u64 {
        self.clock_ms
    }
}

fuzz_target!(|data: &[u8]| {
    let Some((&split, stream)) = data.split_first() else {
        return;
    };
    let step = usize::from(split % 32) + 1;

    // accumulator alone
    let mut rx = RxBuffer::new();
    for chunk in stream.chunks(step) {
        if rx.extend(chunk).is_err() {
            rx.clear();
        }
        while let Ok(Some(frame)) = rx.take_frame() {
            let _ = frame.payload();
        }
    }

    // full state machine
    let transport = ScriptedTransport {
        script: stream.chunks(step).map(<[u8]>::to_vec).collect(),
        chunks: VecDeque::new(),
        per_request: usize::from(split >> 5) + 1,
        clock_ms: 0,
    };
    let Ok(mut driver) = AuroraDriver::new(transport, DriverConfig::default()) else {
        return;
    };
    for _ in 0..(stream.len() / step + 4) {
        driver.tick();
        driver.update();
        driver.transport_mut().clock_ms += 700;
    }
    let _ = driver.state();
});
