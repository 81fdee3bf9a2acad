// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Hand-written union glue on top of the aggregate drivers.
//!
//! ```text
//! union Shape switch (long) {
//!     case 1: double radius;
//!     case 2: string<8> label;
//! };
//! ```

mod common;

use common::{decode, encode};
use hdds_cdr::{
    codec, max_aggregate, member_props, move_aggregate, read_aggregate, write_aggregate,
    AggregateKind, BasicCdrStream, CdrAggregate, CdrStream, CdrType, CdrValue, Encoding,
    Endianness, EntityProperties, Extensibility, Result,
};

const LABEL_BOUND: &[u32] = &[8];

#[derive(Debug, Clone, PartialEq)]
enum Shape {
    Circle(f64),
    Label(String),
}

impl Default for Shape {
    fn default() -> Self {
        Shape::Circle(0.0)
    }
}

impl Shape {
    fn discriminator(&self) -> i32 {
        match self {
            Shape::Circle(_) => 1,
            Shape::Label(_) => 2,
        }
    }
}

impl CdrAggregate for Shape {
    fn aggregate_props() -> EntityProperties {
        let mut props = EntityProperties::aggregate(AggregateKind::Union, Extensibility::Final);
        props.push_member(member_props::<i32>(0, false));
        props.push_member(member_props::<f64>(1, false));
        props.push_member(member_props::<String>(2, false));
        props
    }

    fn is_present(&self, member_id: u32) -> bool {
        member_id == 0 || i64::from(member_id) == i64::from(self.discriminator())
    }

    fn read_member<'b, S: CdrStream<'b>>(
        &mut self,
        stream: &mut S,
        prop: &EntityProperties,
    ) -> Result<()> {
        match (prop.member_id, self) {
            (0, this) => {
                let mut disc = 0i32;
                disc.read_cdr(stream, prop, &[])?;
                *this = match disc {
                    2 => Shape::Label(String::new()),
                    _ => Shape::Circle(0.0),
                };
                Ok(())
            }
            (1, Shape::Circle(radius)) => radius.read_cdr(stream, prop, &[]),
            (2, Shape::Label(label)) => label.read_cdr(stream, prop, LABEL_BOUND),
            _ => Ok(()),
        }
    }

    fn write_member<'b, S: CdrStream<'b>>(
        &self,
        stream: &mut S,
        prop: &EntityProperties,
    ) -> Result<()> {
        match (prop.member_id, self) {
            (0, this) => this.discriminator().write_cdr(stream, prop, &[]),
            (1, Shape::Circle(radius)) => radius.write_cdr(stream, prop, &[]),
            (2, Shape::Label(label)) => label.write_cdr(stream, prop, LABEL_BOUND),
            _ => Ok(()),
        }
    }

    fn move_member<'b, S: CdrStream<'b>>(
        &self,
        stream: &mut S,
        prop: &EntityProperties,
    ) -> Result<()> {
        match (prop.member_id, self) {
            (0, this) => this.discriminator().move_cdr(stream, prop, &[]),
            (1, Shape::Circle(radius)) => radius.move_cdr(stream, prop, &[]),
            (2, Shape::Label(label)) => label.move_cdr(stream, prop, LABEL_BOUND),
            _ => Ok(()),
        }
    }

    fn max_member<'b, S: CdrStream<'b>>(stream: &mut S, prop: &EntityProperties) -> Result<()> {
        match prop.member_id {
            0 => i32::max_cdr(stream, prop, &[]),
            1 => f64::max_cdr(stream, prop, &[]),
            2 => String::max_cdr(stream, prop, LABEL_BOUND),
            _ => Ok(()),
        }
    }
}

impl CdrValue for Shape {
    fn type_props() -> EntityProperties {
        Self::aggregate_props()
    }

    fn read_cdr<'b, S: CdrStream<'b>>(
        &mut self,
        stream: &mut S,
        props: &EntityProperties,
        _bounds: &[u32],
    ) -> Result<()> {
        read_aggregate(self, stream, props)
    }

    fn write_cdr<'b, S: CdrStream<'b>>(
        &self,
        stream: &mut S,
        props: &EntityProperties,
        _bounds: &[u32],
    ) -> Result<()> {
        write_aggregate(self, stream, props)
    }

    fn move_cdr<'b, S: CdrStream<'b>>(
        &self,
        stream: &mut S,
        props: &EntityProperties,
        _bounds: &[u32],
    ) -> Result<()> {
        move_aggregate(self, stream, props)
    }

    fn max_cdr<'b, S: CdrStream<'b>>(
        stream: &mut S,
        props: &EntityProperties,
        _bounds: &[u32],
    ) -> Result<()> {
        max_aggregate::<Self, S>(stream, props)
    }
}

/// Largest branch first, smaller branch last.
#[derive(Debug, Clone, PartialEq)]
enum Measure {
    Precise(f64),
    Coarse(u8),
}

impl Default for Measure {
    fn default() -> Self {
        Measure::Coarse(0)
    }
}

impl CdrAggregate for Measure {
    fn aggregate_props() -> EntityProperties {
        let mut props = EntityProperties::aggregate(AggregateKind::Union, Extensibility::Final);
        props.push_member(member_props::<i32>(0, false));
        props.push_member(member_props::<f64>(1, false));
        props.push_member(member_props::<u8>(2, false));
        props
    }

    fn is_present(&self, member_id: u32) -> bool {
        matches!(
            (member_id, self),
            (0, _) | (1, Measure::Precise(_)) | (2, Measure::Coarse(_))
        )
    }

    fn read_member<'b, S: CdrStream<'b>>(
        &mut self,
        stream: &mut S,
        prop: &EntityProperties,
    ) -> Result<()> {
        match (prop.member_id, self) {
            (0, this) => {
                let mut disc = 0i32;
                disc.read_cdr(stream, prop, &[])?;
                *this = match disc {
                    1 => Measure::Precise(0.0),
                    _ => Measure::Coarse(0),
                };
                Ok(())
            }
            (1, Measure::Precise(value)) => value.read_cdr(stream, prop, &[]),
            (2, Measure::Coarse(value)) => value.read_cdr(stream, prop, &[]),
            _ => Ok(()),
        }
    }

    fn write_member<'b, S: CdrStream<'b>>(
        &self,
        stream: &mut S,
        prop: &EntityProperties,
    ) -> Result<()> {
        match (prop.member_id, self) {
            (0, Measure::Precise(_)) => 1i32.write_cdr(stream, prop, &[]),
            (0, Measure::Coarse(_)) => 2i32.write_cdr(stream, prop, &[]),
            (1, Measure::Precise(value)) => value.write_cdr(stream, prop, &[]),
            (2, Measure::Coarse(value)) => value.write_cdr(stream, prop, &[]),
            _ => Ok(()),
        }
    }

    fn move_member<'b, S: CdrStream<'b>>(
        &self,
        stream: &mut S,
        prop: &EntityProperties,
    ) -> Result<()> {
        match (prop.member_id, self) {
            (0, _) => 0i32.move_cdr(stream, prop, &[]),
            (1, Measure::Precise(value)) => value.move_cdr(stream, prop, &[]),
            (2, Measure::Coarse(value)) => value.move_cdr(stream, prop, &[]),
            _ => Ok(()),
        }
    }

    fn max_member<'b, S: CdrStream<'b>>(stream: &mut S, prop: &EntityProperties) -> Result<()> {
        match prop.member_id {
            0 => i32::max_cdr(stream, prop, &[]),
            1 => f64::max_cdr(stream, prop, &[]),
            2 => u8::max_cdr(stream, prop, &[]),
            _ => Ok(()),
        }
    }
}

impl CdrValue for Measure {
    fn type_props() -> EntityProperties {
        Self::aggregate_props()
    }

    fn read_cdr<'b, S: CdrStream<'b>>(
        &mut self,
        stream: &mut S,
        props: &EntityProperties,
        _bounds: &[u32],
    ) -> Result<()> {
        read_aggregate(self, stream, props)
    }

    fn write_cdr<'b, S: CdrStream<'b>>(
        &self,
        stream: &mut S,
        props: &EntityProperties,
        _bounds: &[u32],
    ) -> Result<()> {
        write_aggregate(self, stream, props)
    }

    fn move_cdr<'b, S: CdrStream<'b>>(
        &self,
        stream: &mut S,
        props: &EntityProperties,
        _bounds: &[u32],
    ) -> Result<()> {
        move_aggregate(self, stream, props)
    }

    fn max_cdr<'b, S: CdrStream<'b>>(
        stream: &mut S,
        props: &EntityProperties,
        _bounds: &[u32],
    ) -> Result<()> {
        max_aggregate::<Self, S>(stream, props)
    }
}

#[derive(CdrType, Debug, Default, Clone, PartialEq)]
#[cdr(extensibility = "mutable")]
struct Drawing {
    id: u16,
    shape: Shape,
    shapes: Vec<Shape>,
}

#[test]
fn test_only_the_active_branch_is_written() {
    let label = encode(&Shape::Label("hi".into()), Encoding::Basic, Endianness::Big);
    assert_eq!(label, vec![0, 0, 0, 2, 0, 0, 0, 3, b'h', b'i', 0]);

    let circle = encode(&Shape::Circle(1.5), Encoding::Basic, Endianness::Big);
    assert_eq!(
        circle,
        vec![0, 0, 0, 1, 0, 0, 0, 0, 0x3F, 0xF8, 0, 0, 0, 0, 0, 0]
    );
}

#[test]
fn test_union_round_trip_in_every_format() {
    for shape in [Shape::Circle(-2.25), Shape::Label("octagon".into())] {
        for encoding in common::ENCODINGS {
            for endianness in common::ENDIANNESSES {
                let bytes = encode(&shape, encoding, endianness);
                assert_eq!(decode::<Shape>(&bytes, encoding, endianness), shape);
            }
        }
    }
}

#[test]
fn test_union_max_is_largest_branch() {
    let mut stream = BasicCdrStream::default();
    codec::max::<Shape, _>(&mut stream, false).expect("max");
    // Discriminator, then max(pad + double = 12, length + 8 chars + nul = 13).
    assert_eq!(stream.position(), 4 + 13);
}

#[test]
fn test_union_max_keeps_alignment_of_largest_branch() {
    let mut stream = BasicCdrStream::default();
    codec::max::<Measure, _>(&mut stream, false).expect("max");
    // Discriminator, padding, double; the u8 branch is visited last.
    assert_eq!(stream.position(), 16);
    assert_eq!(stream.alignment(), 8);

    for measure in [Measure::Precise(0.25), Measure::Coarse(3)] {
        for encoding in common::ENCODINGS {
            let bytes = encode(&measure, encoding, Endianness::Little);
            assert_eq!(decode::<Measure>(&bytes, encoding, Endianness::Little), measure);
        }
    }
}

#[test]
fn test_union_members_in_mutable_struct() {
    let drawing = Drawing {
        id: 3,
        shape: Shape::Label("tri".into()),
        shapes: vec![Shape::Circle(1.0), Shape::Label("sq".into())],
    };
    for encoding in common::XTYPES_ENCODINGS {
        for endianness in common::ENDIANNESSES {
            let bytes = encode(&drawing, encoding, endianness);
            assert_eq!(decode::<Drawing>(&bytes, encoding, endianness), drawing);
        }
    }
}
