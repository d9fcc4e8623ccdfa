// Exit status table: each program must produce the status on both backends

use cfixture::config::Limits;
use cfixture::conformance::{check, Verdict};
use cfixture::parser::parse_source;

macro_rules! status_test {
    ($name:ident, $code:literal, $status:expr) => {
        #[test]
        fn $name() {
            let program = parse_source($code).expect("Parsing failed");
            let report = check(&program, Some($status), &Limits::default());
            assert_eq!(report.verdict, Verdict::Pass, "{}\n{}", $code, report);
        }
    };
}

status_test!(test_literal, "int main(){return 123;}", 123);
status_test!(test_parens, "int main(){return ((((123))));}", 123);
status_test!(test_additive, "int main(){return 123+56-5;}", 174);
status_test!(test_octal_hex, "int main(){return 043+0x29;}", 76);
status_test!(test_comma, "int main(){return 43,6*(3+7)-5*1;}", 55);
status_test!(test_relational, "int main(){return 173+(1<2);}", 174);
status_test!(test_shift, "int main(){return (1<<4)+(256>>3);}", 48);
status_test!(test_bitwise, "int main(){return (12&10)|(1^3);}", 10);
status_test!(test_logical_not, "int main(){return !0 + !5 + ~-3;}", 3);
status_test!(test_negative_wraps, "int main(){return -2;}", 254);
status_test!(test_truncated, "int main(){return 511;}", 255);
status_test!(test_char_literal, "int main(){return 'A' + '\\n';}", 75);

status_test!(
    test_prefix_postfix_locals,
    "int main(){int x=5; int y=x++; int z=++x; return x*100+y*10+z;}",
    // 7*100 + 5*10 + 7 = 757
    (757 % 256) as u8
);
status_test!(
    test_decrement_in_condition,
    "int main(){int n=4; int s=0; while(n--) s+=n; return s*10+n;}",
    // s = 3+2+1+0 = 6, n ends at -1
    ((60 - 1) & 0xFF) as u8
);
status_test!(
    test_postfix_in_call_argument,
    "int id(int v){return v;} int main(){int i=3; int r=id(i++); return r*10+i;}",
    34
);
status_test!(
    test_postfix_before_logical_and,
    "int main(){int i=0; int r=i++ && i; return r*10+i;}",
    1
);
status_test!(
    test_ternary_sequences_condition,
    "int main(){int i=1; int r=i++ ? i : 100; return r;}",
    2
);
status_test!(
    test_compound_assignment,
    "int main(){int x=10; x+=5; x-=3; x*=2; x/=4; x%=4; x<<=3; x>>=1; x|=1; x^=3; x&=6; return x;}",
    2
);
status_test!(
    test_unsigned_wrap,
    "int main(){unsigned int u=0; u--; return u==4294967295u;}",
    1
);
status_test!(
    test_char_overflow_wraps,
    "int main(){char c=127; c++; return c==-128;}",
    1
);
status_test!(
    test_usual_conversions,
    "int main(){unsigned int u=1; int m=-1; return m<u ? 1 : 2;}",
    2
);
status_test!(
    test_sizeof_kinds,
    "int main(){return sizeof(char)+sizeof(short)*10+sizeof(long)*100;}",
    (821 % 256) as u8
);
status_test!(
    test_recursion,
    "int fact(int n){if(n<=1) return 1; return n*fact(n-1);} int main(){return fact(5);}",
    120
);
status_test!(
    test_do_while_and_for,
    "int main(){int s=0; int i=0; do { s+=i; i++; } while(i<5);
        for(int j=0;j<3;j++) s+=j; return s;}",
    13
);
status_test!(
    test_switch_fallthrough,
    "int main(){int r=0; switch(2){case 1: r+=1; case 2: r+=2;
        case 3: r+=3; break; default: r+=100;} return r;}",
    5
);
status_test!(
    test_global_initializers_in_order,
    "int a=3; int b=a*2; int main(){return a+b;}",
    9
);
status_test!(
    test_exit_from_nested_call,
    "int f(int x){exit(x+1); return 0;} int main(){return f(41);}",
    42
);
