use typeinfo::hex::hex_of_bytes;
use typeinfo::{record, Error, Reflect};

record! {
    #[derive(Debug, Default, Clone, PartialEq)]
    struct Pair {
        a: i32,
        b: String,
    }
}

fn check<T>(hex: &str, val: T)
where
    T: Reflect + Default + PartialEq + std::fmt::Debug,
{
    let bytes = typeinfo::to_binary(&val).unwrap();
    assert_eq!(hex_of_bytes(&bytes), hex);
    assert_eq!(typeinfo::from_binary::<T>(&bytes).unwrap(), val);
    let doc = typeinfo::to_json(&val).unwrap();
    assert_eq!(typeinfo::from_json::<T>(&doc).unwrap(), val);
}

fn main() {
    let p = Pair {
        a: -7,
        b: "hi".into(),
    };
    check("82a161d2fffffff9a162a26869", p.clone());
    check("93cc01cc02cc03", vec![1u8, 2, 3]);
    check("c3", true);
    check("d0ff", -1i8);

    assert_eq!(
        typeinfo::to_json(&p).unwrap(),
        serde_json::json!({ "a": -7, "b": "hi" })
    );

    let mut v: Vec<u8> = Vec::new();
    typeinfo::json::decode_json_str("[9, 8, 7, 6, 5]", &mut v, Vec::<u8>::descriptor()).unwrap();
    assert_eq!(v, vec![9, 8, 7, 6, 5]);

    let mut q = p.clone();
    let err = typeinfo::from_json_into(&serde_json::json!({ "a": 1, "c": 2 }), &mut q).unwrap_err();
    assert!(matches!(err, Error::UnknownKey(ref k) if k == "c"));
    assert_eq!(q, p);

    assert!(matches!(typeinfo::to_binary(&7u64), Err(Error::Unsupported(_))));

    let digest = typeinfo::hash_of(&p).unwrap();
    assert_eq!(digest, typeinfo::hash_of(&p.clone()).unwrap());
    println!("{digest}");
}
