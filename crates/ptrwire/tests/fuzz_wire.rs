use proptest::prelude::*;
use ptrwire::codec::{
    Blob, BoolField, ElementSize, ListPointer, Message, MessageBuilder, PrimitiveField,
    StructPointer,
};
use ptrwire::model::{StructBuilder, Type};
use ptrwire::{compile, CompileOptions, Schema};

proptest! {
    #[test]
    fn fuzz_blob_reads_little_endian(
        prefix in prop::collection::vec(any::<u8>(), 0..32),
        value in any::<u64>(),
    ) {
        let mut buf = prefix.clone();
        buf.extend_from_slice(&value.to_le_bytes());
        let blob = Blob::new(&buf, 0);
        let offset = prefix.len();

        prop_assert_eq!(blob.read_u64(offset).unwrap(), value);
        prop_assert_eq!(blob.read_u32(offset).unwrap(), value as u32);
        prop_assert_eq!(blob.read_u16(offset).unwrap(), value as u16);
        prop_assert_eq!(blob.read_i64(offset).unwrap(), value as i64);
        prop_assert_eq!(blob.read_bits(offset, 3).unwrap(), value & 0xff_ffff);
    }

    #[test]
    fn fuzz_struct_pointer_target(
        slot in 0usize..16,
        word_offset in -1000i32..1000,
        data_words in any::<u16>(),
        ptr_words in any::<u16>(),
    ) {
        // an all-zero struct pointer is null
        prop_assume!(word_offset != 0 || data_words != 0 || ptr_words != 0);
        let ptr = StructPointer { offset: word_offset, data_words, ptr_words };
        let mut buf = vec![0u8; 16 * 8];
        buf[slot * 8..slot * 8 + 8].copy_from_slice(&ptr.encode().to_le_bytes());
        let blob = Blob::new(&buf, 0);

        let expected = (slot * 8) as i64 + 8 + 8 * i64::from(word_offset);
        prop_assert_eq!(blob.deref_ptr_struct(slot * 8).unwrap(), Some(expected));
        prop_assert_eq!(
            blob.unpack_ptr_struct(slot * 8).unwrap(),
            (word_offset, data_words, ptr_words)
        );
    }

    #[test]
    fn fuzz_list_pointer_target(
        word_offset in -1000i32..1000,
        tag in 0u8..8,
        count in 0u32..(1 << 29),
    ) {
        let ptr = ListPointer { offset: word_offset, element_size: ElementSize::from_tag(tag), count };
        let buf = ptr.encode().to_le_bytes();
        let blob = Blob::new(&buf, 0);

        prop_assert_eq!(blob.deref_ptr_list(0).unwrap(), Some(8 + 8 * i64::from(word_offset)));
        prop_assert_eq!(
            blob.unpack_ptr_list(0).unwrap(),
            (word_offset, ElementSize::from_tag(tag), count)
        );
    }

    #[test]
    fn fuzz_null_pointer_is_absent(slot in 0usize..4) {
        let buf = [0u8; 32];
        let blob = Blob::new(&buf, 0);
        let offset = slot * 8;

        prop_assert!(blob.read_struct::<Blob<'_>>(offset).unwrap().is_none());
        prop_assert!(blob.read_raw_list(offset).unwrap().is_none());
        prop_assert!(blob.read_text(offset).unwrap().is_none());
        prop_assert!(blob.read_data(offset).unwrap().is_none());
        prop_assert_eq!(blob.deref_ptr_struct(offset).unwrap(), None);
    }

    #[test]
    fn fuzz_default_xor_round_trip(actual in any::<i32>(), default in any::<i32>()) {
        let stored = (actual ^ default).to_le_bytes();
        let blob = Blob::new(&stored, 0);
        let field = PrimitiveField::<i32>::new(0).with_default(default);
        prop_assert_eq!(field.read(&blob).unwrap(), actual);
    }

    #[test]
    fn fuzz_float_default_xor_round_trip(actual in any::<f64>(), default in any::<f64>()) {
        let stored = (actual.to_bits() ^ default.to_bits()).to_le_bytes();
        let blob = Blob::new(&stored, 0);
        let field = PrimitiveField::<f64>::new(0).with_default(default);
        prop_assert_eq!(field.read(&blob).unwrap().to_bits(), actual.to_bits());
    }

    #[test]
    fn fuzz_bool_bit(bytes in prop::collection::vec(any::<u8>(), 8), k in 0usize..64, default in any::<bool>()) {
        let blob = Blob::new(&bytes, 0);
        let expected = ((bytes[k / 8] >> (k % 8)) & 1 == 1) ^ default;
        prop_assert_eq!(BoolField::slot(k).with_default(default).read(&blob).unwrap(), expected);
    }

    #[test]
    fn fuzz_wire_sections_override_schema(
        data_words in 0u16..8,
        ptr_words in 1u16..4,
        n in any::<u64>(),
        name in "[a-z]{0,12}",
    ) {
        // struct S { n @0 :UInt64; name @1 :Text; }
        let schema = Schema::from_nodes([StructBuilder::new(1, "S")
            .data_words(1)
            .pointers(1)
            .slot("n", 0, Type::UINT64)
            .slot("name", 0, Type::Text)
            .build()])
        .unwrap();
        let compiled = compile(&schema, [1], CompileOptions::default()).unwrap();

        let mut builder = MessageBuilder::new();
        let root = builder.init_root(data_words, ptr_words).unwrap();
        for word in 0..usize::from(data_words) {
            builder.set_u64(root.offset + word * 8, n.rotate_left(word as u32)).unwrap();
        }
        builder.set_text(root.pointer(0), &name).unwrap();
        for extra in 1..ptr_words {
            builder.set_text(root.pointer(extra), "extra").unwrap();
        }
        let bytes = builder.into_bytes();
        let message = Message::from_segment(&bytes).unwrap();
        let view = compiled.read_root(1, &message).unwrap().unwrap();

        let expected_n = if data_words == 0 { 0 } else { n };
        prop_assert_eq!(view.get("n").unwrap().unwrap().as_u64(), Some(expected_n));
        prop_assert!(view.has("name").unwrap());
        prop_assert_eq!(view.get("name").unwrap().unwrap().as_text(), Some(name.as_str()));
    }

    #[test]
    fn fuzz_pointer_reads_no_panics(
        bytes in prop::collection::vec(any::<u8>(), 0..512),
        offset in 0usize..512,
    ) {
        // Only checks that arbitrary words never panic.
        let blob = Blob::new(&bytes, 0);
        let _ = blob.read_struct::<Blob<'_>>(offset);
        let _ = blob.read_text(offset);
        let _ = blob.read_data(offset);
        if let Ok(Some(list)) = blob.read_raw_list(offset) {
            for i in 0..list.len().min(16) {
                let _ = list.element_offset(i);
                let _ = list.read_bool(i);
                let _ = list.struct_element(i);
            }
        }
    }

    #[test]
    fn fuzz_message_stream_no_panics(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
        if let Ok(message) = Message::from_stream(&bytes) {
            let _ = message.root_struct::<Blob<'_>>();
        }
    }
}
