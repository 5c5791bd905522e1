//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Benchmarks for the inbound Telnet filter

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use telemux_codec::{FilterVerdict, TelnetFilter, consts};

fn bench_plain_data(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter_plain_data");

    for size in [64, 512, 4096].iter() {
        group.throughput(Throughput::Bytes(*size as u64));

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let data: Vec<u8> = (0..size).map(|i| (i % 96 + 32) as u8).collect();
            let mut filter = TelnetFilter::new();

            b.iter(|| {
                for &byte in &data {
                    black_box(filter.advance(black_box(byte)));
                }
            });
        });
    }

    group.finish();
}

fn bench_escape_heavy(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter_escape_heavy");

    // Alternating escaped IACs and negotiation triples.
    let mut data = Vec::with_capacity(4096);
    while data.len() < 4096 {
        data.extend_from_slice(&[consts::IAC, consts::IAC]);
        data.extend_from_slice(&[consts::IAC, consts::WILL, consts::option::BINARY]);
        data.extend_from_slice(&[consts::IAC, consts::WONT, consts::option::BINARY]);
        data.push(b'x');
    }
    group.throughput(Throughput::Bytes(data.len() as u64));

    group.bench_function("mixed_sequences", |b| {
        let mut filter = TelnetFilter::new();
        b.iter(|| {
            let mut kept = 0usize;
            for &byte in &data {
                if filter.advance(black_box(byte)) == FilterVerdict::Keep {
                    kept += 1;
                }
            }
            black_box(kept)
        });
    });

    group.finish();
}

criterion_group!(benches, bench_plain_data, bench_escape_heavy);
criterion_main!(benches);
